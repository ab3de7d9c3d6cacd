//! Analysis pipeline orchestrator.
//!
//! The `Analyzer` owns one strategy per capability. Which strategies are used
//! (heuristic only, or remote with heuristic fallback) is decided once at
//! construction and never changes afterwards.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{QaPair, SheetStatus, Topic, UnderstandingRecord};
use crate::patterns::PatternLibrary;
use crate::remote::{RemoteScorer, RemoteSegmenter, RemoteSettings, RemoteTopicExtractor};
use crate::report::AnalysisReport;
use crate::scoring::{HeuristicScorer, Jitter};
use crate::segment::HeuristicSegmenter;
use crate::topics::HeuristicTopicExtractor;
use crate::traits::{InferenceClient, QaSegmenter, TopicExtractor, UnderstandingScorer};

/// Which strategy family the analyzer was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Heuristic,
    Remote,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Heuristic => write!(f, "heuristic"),
            AnalysisMode::Remote => write!(f, "remote"),
        }
    }
}

/// Outcome of processing one answer sheet against a syllabus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetOutcome {
    pub status: SheetStatus,
    pub records: Vec<UnderstandingRecord>,
    /// Why the sheet ended in `error`, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The text-analysis pipeline.
pub struct Analyzer {
    mode: AnalysisMode,
    topics: Box<dyn TopicExtractor>,
    segmenter: Box<dyn QaSegmenter>,
    scorer: Box<dyn UnderstandingScorer>,
}

impl Analyzer {
    /// Heuristic strategies only.
    pub fn heuristic(jitter: Arc<dyn Jitter>) -> Self {
        let patterns = PatternLibrary::new();
        Self {
            mode: AnalysisMode::Heuristic,
            topics: Box::new(HeuristicTopicExtractor::new(patterns.clone())),
            segmenter: Box::new(HeuristicSegmenter::new(patterns)),
            scorer: Box::new(HeuristicScorer::new(jitter)),
        }
    }

    /// Remote strategies, each falling back to its heuristic counterpart.
    pub fn remote(client: Arc<dyn InferenceClient>, settings: RemoteSettings, jitter: Arc<dyn Jitter>) -> Self {
        let patterns = PatternLibrary::new();
        Self {
            mode: AnalysisMode::Remote,
            topics: Box::new(RemoteTopicExtractor::new(
                Arc::clone(&client),
                settings.clone(),
                HeuristicTopicExtractor::new(patterns.clone()),
            )),
            segmenter: Box::new(RemoteSegmenter::new(
                Arc::clone(&client),
                settings.clone(),
                HeuristicSegmenter::new(patterns),
            )),
            scorer: Box::new(RemoteScorer::new(client, settings, HeuristicScorer::new(jitter))),
        }
    }

    /// Remote when a client is available, heuristic otherwise.
    pub fn new(client: Option<Arc<dyn InferenceClient>>, settings: RemoteSettings, jitter: Arc<dyn Jitter>) -> Self {
        match client {
            Some(client) => {
                tracing::info!(client = client.name(), model = %settings.model, "using remote analysis");
                Self::remote(client, settings, jitter)
            }
            None => {
                tracing::info!("no inference credential configured, using heuristic analysis");
                Self::heuristic(jitter)
            }
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub async fn extract_topics(&self, syllabus_text: &str) -> Vec<Topic> {
        self.topics.extract(syllabus_text).await
    }

    pub async fn segment(&self, answer_text: &str) -> Vec<QaPair> {
        self.segmenter.segment(answer_text).await
    }

    pub async fn score(&self, topics: &[Topic], pairs: &[QaPair]) -> Vec<UnderstandingRecord> {
        self.scorer.score(topics, pairs).await
    }

    /// Score an answer sheet's pairs against a syllabus's topics.
    ///
    /// The sheet ends in `error` when there is nothing to score on either side.
    pub async fn process_answer_sheet(&self, topics: &[Topic], pairs: &[QaPair]) -> SheetOutcome {
        let reason = if topics.is_empty() {
            Some("syllabus has no topics")
        } else if pairs.is_empty() {
            Some("answer sheet has no question/answer pairs")
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::warn!(reason, "answer sheet not analyzed");
            return SheetOutcome {
                status: SheetStatus::Error,
                records: Vec::new(),
                reason: Some(reason.to_string()),
            };
        }

        SheetOutcome {
            status: SheetStatus::Processed,
            records: self.score(topics, pairs).await,
            reason: None,
        }
    }

    /// Run the whole pipeline over a syllabus and an answer sheet.
    pub async fn analyze(&self, syllabus_text: &str, answer_text: &str) -> AnalysisReport {
        let start = Instant::now();

        let topics = self.extract_topics(syllabus_text).await;
        let qa_pairs = self.segment(answer_text).await;
        let outcome = self.process_answer_sheet(&topics, &qa_pairs).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            mode = %self.mode,
            topics = topics.len(),
            pairs = qa_pairs.len(),
            records = outcome.records.len(),
            status = %outcome.status,
            duration_ms,
            "analysis complete"
        );

        AnalysisReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            mode: self.mode,
            status: outcome.status,
            reason: outcome.reason,
            topics,
            qa_pairs,
            records: outcome.records,
            duration_ms,
        }
    }
}
