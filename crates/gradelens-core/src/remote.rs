//! Remote-inference strategies with heuristic fallback.
//!
//! Each strategy sends one prompt to an [`InferenceClient`], bounded by the
//! configured timeout, and parses the completion into the expected shape.
//! Any failure (transport, status, timeout, payload) is logged and the
//! wrapped heuristic strategy answers instead, so callers never see an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::InferenceError;
use crate::model::{truncate_chars, QaPair, Topic, UnderstandingRecord, MAX_QA_PAIRS};
use crate::scoring::HeuristicScorer;
use crate::segment::HeuristicSegmenter;
use crate::topics::{normalize_topics, HeuristicTopicExtractor};
use crate::traits::{
    parse_json_payload, InferenceClient, InferenceRequest, QaSegmenter, TopicExtractor,
    UnderstandingScorer,
};

const TOPIC_INPUT_CHARS: usize = 3000;
const SEGMENT_INPUT_CHARS: usize = 4000;
const TRANSCRIPT_CHARS: usize = 3000;
const SCORED_PAIRS: usize = 10;
const SCORED_TOPICS: usize = 10;

const TOPIC_MAX_TOKENS: u32 = 500;
const SEGMENT_MAX_TOKENS: u32 = 2000;
const SCORE_MAX_TOKENS: u32 = 2000;

const TOPIC_SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts topics from educational content. Always return valid JSON arrays.";
const SEGMENT_SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts question-answer pairs from exam answer sheets. Always return valid JSON arrays.";
const SCORE_SYSTEM_PROMPT: &str =
    "You are an educational assessment assistant. Analyze student understanding and return valid JSON.";

/// Model parameters shared by every remote strategy.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub model: String,
    pub temperature: f64,
    /// Upper bound on a single remote call, after which the fallback runs.
    pub timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One bounded attempt. Never retried.
async fn ask(
    client: &dyn InferenceClient,
    settings: &RemoteSettings,
    system_prompt: &str,
    prompt: String,
    max_tokens: u32,
) -> Result<String, InferenceError> {
    let request = InferenceRequest {
        model: settings.model.clone(),
        system_prompt: system_prompt.to_string(),
        prompt,
        temperature: settings.temperature,
        max_tokens,
    };

    match tokio::time::timeout(settings.timeout, client.complete(&request)).await {
        Ok(result) => result.map(|response| response.content),
        Err(_) => Err(InferenceError::Timeout(settings.timeout.as_secs())),
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

pub fn topic_prompt(text: &str) -> String {
    format!(
        "Extract all distinct topics/subjects from the following syllabus text.\n\
         Return only a JSON array of topic names, nothing else.\n\n\
         Syllabus text:\n{}\n\n\
         Return format: [\"topic1\", \"topic2\", \"topic3\"]",
        truncate_chars(text, TOPIC_INPUT_CHARS)
    )
}

/// Topic extraction through a language model.
pub struct RemoteTopicExtractor {
    client: Arc<dyn InferenceClient>,
    settings: RemoteSettings,
    fallback: HeuristicTopicExtractor,
}

impl RemoteTopicExtractor {
    pub fn new(client: Arc<dyn InferenceClient>, settings: RemoteSettings, fallback: HeuristicTopicExtractor) -> Self {
        Self {
            client,
            settings,
            fallback,
        }
    }

    #[instrument(skip_all, fields(client = self.client.name()))]
    async fn try_remote(&self, text: &str) -> Result<Vec<Topic>, InferenceError> {
        let content = ask(
            self.client.as_ref(),
            &self.settings,
            TOPIC_SYSTEM_PROMPT,
            topic_prompt(text),
            TOPIC_MAX_TOKENS,
        )
        .await?;
        let labels: Vec<String> = parse_json_payload(&content)?;
        Ok(normalize_topics(labels))
    }
}

#[async_trait]
impl TopicExtractor for RemoteTopicExtractor {
    async fn extract(&self, text: &str) -> Vec<Topic> {
        match self.try_remote(text).await {
            Ok(topics) => topics,
            Err(e) => {
                tracing::warn!(error = %e, "remote topic extraction failed, using fallback");
                self.fallback.extract(text).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

pub fn segment_prompt(text: &str) -> String {
    format!(
        "Extract all question-answer pairs from the following answer sheet text.\n\
         Return a JSON array of objects with \"question\" and \"answer\" keys.\n\n\
         Answer sheet text:\n{}\n\n\
         Return format: [{{\"question\": \"Q1\", \"answer\": \"A1\"}}, {{\"question\": \"Q2\", \"answer\": \"A2\"}}]",
        truncate_chars(text, SEGMENT_INPUT_CHARS)
    )
}

/// Keep entries that are objects with non-empty string `question` and `answer`.
fn pairs_from_values(values: Vec<Value>) -> Vec<QaPair> {
    values
        .iter()
        .filter_map(|entry| {
            let question = entry.get("question")?.as_str()?;
            let answer = entry.get("answer")?.as_str()?;
            QaPair::bounded(question, answer)
        })
        .take(MAX_QA_PAIRS)
        .collect()
}

/// Question/answer segmentation through a language model.
pub struct RemoteSegmenter {
    client: Arc<dyn InferenceClient>,
    settings: RemoteSettings,
    fallback: HeuristicSegmenter,
}

impl RemoteSegmenter {
    pub fn new(client: Arc<dyn InferenceClient>, settings: RemoteSettings, fallback: HeuristicSegmenter) -> Self {
        Self {
            client,
            settings,
            fallback,
        }
    }

    #[instrument(skip_all, fields(client = self.client.name()))]
    async fn try_remote(&self, text: &str) -> Result<Vec<QaPair>, InferenceError> {
        let content = ask(
            self.client.as_ref(),
            &self.settings,
            SEGMENT_SYSTEM_PROMPT,
            segment_prompt(text),
            SEGMENT_MAX_TOKENS,
        )
        .await?;
        let values: Vec<Value> = parse_json_payload(&content)?;
        let total = values.len();
        let pairs = pairs_from_values(values);
        if pairs.len() < total.min(MAX_QA_PAIRS) {
            tracing::debug!(total, kept = pairs.len(), "discarded malformed remote pairs");
        }
        Ok(pairs)
    }
}

#[async_trait]
impl QaSegmenter for RemoteSegmenter {
    async fn segment(&self, text: &str) -> Vec<QaPair> {
        match self.try_remote(text).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!(error = %e, "remote segmentation failed, using fallback");
                self.fallback.segment(text).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

pub fn score_prompt(topics: &[Topic], pairs: &[QaPair]) -> String {
    let transcript = pairs
        .iter()
        .take(SCORED_PAIRS)
        .map(|p| format!("Q: {}\nA: {}", p.question, p.answer))
        .collect::<Vec<_>>()
        .join("\n\n");
    let topic_list = topics
        .iter()
        .take(SCORED_TOPICS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the student's understanding of each topic based on their answers.\n\
         Topics: {topic_list}\n\n\
         Question-Answer pairs:\n{}\n\n\
         For each topic, provide:\n\
         - understanding_score (0-100): How well the student understands this topic\n\
         - confidence (0-1): How confident you are in this assessment\n\
         - details: Brief explanation\n\n\
         Return JSON array: [{{\"topic\": \"topic1\", \"understanding_score\": 85, \"confidence\": 0.9, \"details\": \"...\"}}, ...]",
        truncate_chars(&transcript, TRANSCRIPT_CHARS)
    )
}

#[derive(Debug, Deserialize)]
struct RemoteAssessment {
    topic: String,
    understanding_score: f64,
    confidence: f64,
    #[serde(default)]
    details: String,
}

fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Align remote assessments with the topics that were sent.
///
/// Every sent topic must be covered, otherwise the payload is rejected.
fn align_assessments(
    sent: &[Topic],
    assessments: Vec<RemoteAssessment>,
) -> Result<Vec<UnderstandingRecord>, InferenceError> {
    let mut by_topic: HashMap<String, RemoteAssessment> = HashMap::new();
    for assessment in assessments {
        by_topic.entry(topic_key(&assessment.topic)).or_insert(assessment);
    }

    sent.iter()
        .map(|topic| {
            let assessment = by_topic
                .get(&topic_key(topic))
                .ok_or_else(|| InferenceError::MalformedPayload(format!("no assessment for topic '{topic}'")))?;
            Ok(UnderstandingRecord::new(
                topic.as_str(),
                assessment.understanding_score,
                assessment.confidence,
                assessment.details.clone(),
            ))
        })
        .collect()
}

/// Understanding scoring through a language model.
///
/// Only the first ten topics are sent; the rest are always scored by the
/// fallback so that every topic gets exactly one record.
pub struct RemoteScorer {
    client: Arc<dyn InferenceClient>,
    settings: RemoteSettings,
    fallback: HeuristicScorer,
}

impl RemoteScorer {
    pub fn new(client: Arc<dyn InferenceClient>, settings: RemoteSettings, fallback: HeuristicScorer) -> Self {
        Self {
            client,
            settings,
            fallback,
        }
    }

    #[instrument(skip_all, fields(client = self.client.name(), topics = sent.len()))]
    async fn try_remote(&self, sent: &[Topic], pairs: &[QaPair]) -> Result<Vec<UnderstandingRecord>, InferenceError> {
        let content = ask(
            self.client.as_ref(),
            &self.settings,
            SCORE_SYSTEM_PROMPT,
            score_prompt(sent, pairs),
            SCORE_MAX_TOKENS,
        )
        .await?;
        let assessments: Vec<RemoteAssessment> = parse_json_payload(&content)?;
        align_assessments(sent, assessments)
    }
}

#[async_trait]
impl UnderstandingScorer for RemoteScorer {
    async fn score(&self, topics: &[Topic], pairs: &[QaPair]) -> Vec<UnderstandingRecord> {
        if topics.is_empty() {
            return Vec::new();
        }

        let split = topics.len().min(SCORED_TOPICS);
        let (sent, rest) = topics.split_at(split);

        let mut records = match self.try_remote(sent, pairs).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "remote scoring failed, using fallback");
                return self.fallback.score_now(topics, pairs);
            }
        };
        records.extend(self.fallback.score_now(rest, pairs));
        records
    }
}
