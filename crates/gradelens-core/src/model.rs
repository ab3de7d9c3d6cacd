//! Core data model types for gradelens.
//!
//! These are the values that flow through the analysis pipeline (topics,
//! question/answer pairs, understanding records) and the identity types the
//! external store attaches to them before aggregation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored length of a question, in characters.
pub const MAX_QUESTION_CHARS: usize = 500;
/// Maximum stored length of an answer, in characters.
pub const MAX_ANSWER_CHARS: usize = 2000;
/// Maximum length of a topic label, in characters.
pub const MAX_TOPIC_CHARS: usize = 100;
/// Maximum number of topics returned by one extraction.
pub const MAX_TOPICS: usize = 15;
/// Maximum number of pairs returned by one segmentation.
pub const MAX_QA_PAIRS: usize = 20;

/// A short label naming a subject area extracted from syllabus text.
pub type Topic = String;

/// One question paired with the student's answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    /// Build a pair, truncating both sides to their storage limits.
    ///
    /// Returns `None` when either side is empty after trimming.
    pub fn bounded(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: truncate_chars(question, MAX_QUESTION_CHARS),
            answer: truncate_chars(answer, MAX_ANSWER_CHARS),
        })
    }
}

/// How well one topic is understood, as judged from one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderstandingRecord {
    pub topic: Topic,
    /// 0–100 understanding estimate.
    #[serde(rename = "understanding_score")]
    pub score: f64,
    /// 0–1 reliability of `score`.
    pub confidence: f64,
    /// Human-readable explanation.
    #[serde(default)]
    pub details: String,
}

impl UnderstandingRecord {
    /// Create a record with `score` clamped to [0, 100] and `confidence` to [0, 1].
    ///
    /// Non-finite inputs collapse to 0.
    pub fn new(topic: impl Into<Topic>, score: f64, confidence: f64, details: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            score: clamp_finite(score, 0.0, 100.0),
            confidence: clamp_finite(confidence, 0.0, 1.0),
            details: details.into(),
        }
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// A teacher who owns syllabi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: u64,
    pub name: String,
}

/// A student known to the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: u64,
    pub name: String,
}

impl Student {
    /// First whitespace-delimited token of the name, used as a chart key.
    ///
    /// Two students sharing a first name collide on this key.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

/// A syllabus with its extracted topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Syllabus {
    pub id: u64,
    pub teacher_id: u64,
    #[serde(default)]
    pub topics: Vec<Topic>,
    pub created_at: DateTime<Utc>,
}

/// Processing state of an uploaded answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetStatus {
    Processing,
    Processed,
    Error,
}

impl fmt::Display for SheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetStatus::Processing => write!(f, "processing"),
            SheetStatus::Processed => write!(f, "processed"),
            SheetStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for SheetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(SheetStatus::Processing),
            "processed" => Ok(SheetStatus::Processed),
            "error" | "failed" => Ok(SheetStatus::Error),
            other => Err(format!("unknown sheet status: {other}")),
        }
    }
}

/// An uploaded answer sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub id: u64,
    pub student_id: u64,
    /// Stored file name (without directory).
    #[serde(default)]
    pub file_name: String,
    #[serde(default = "default_status")]
    pub status: SheetStatus,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

fn default_status() -> SheetStatus {
    SheetStatus::Processing
}

/// An understanding record as persisted against an answer sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub answer_sheet_id: u64,
    pub syllabus_id: u64,
    #[serde(flatten)]
    pub record: UnderstandingRecord,
    pub created_at: DateTime<Utc>,
}
