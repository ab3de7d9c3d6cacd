//! Keyword-coverage understanding scoring.
//!
//! The heuristic score is the fraction of a topic's words that appear in the
//! student's questions and answers, scaled to 0–100, perturbed by a bounded
//! jitter and clamped. The jitter source is injected so callers can seed it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{QaPair, Topic, UnderstandingRecord};
use crate::traits::UnderstandingScorer;

/// Largest absolute perturbation applied to a heuristic score.
pub const JITTER_RANGE: f64 = 10.0;
/// Added to coverage to obtain confidence (before capping at 1).
const CONFIDENCE_FLOOR: f64 = 0.3;

/// Source of the bounded score perturbation.
pub trait Jitter: Send + Sync {
    /// Draw a value in `[-JITTER_RANGE, JITTER_RANGE]`.
    fn sample(&self) -> f64;
}

/// Pseudo-random jitter backed by a `StdRng`.
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    /// Jitter seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible jitter (for tests and `--seed`).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(-JITTER_RANGE..=JITTER_RANGE)
    }
}

/// Constant jitter, clamped into the legal range.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl FixedJitter {
    pub fn zero() -> Self {
        Self(0.0)
    }
}

impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(-JITTER_RANGE, JITTER_RANGE)
    }
}

/// How many of a topic's words were found in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordCoverage {
    pub matched: usize,
    pub total: usize,
}

impl KeywordCoverage {
    /// Count topic words (lowercased, whitespace-delimited) occurring as
    /// substrings of an already lowercased corpus.
    pub fn measure(topic: &str, corpus: &str) -> Self {
        let topic = topic.to_lowercase();
        let words: Vec<&str> = topic.split_whitespace().collect();
        let matched = words.iter().filter(|w| corpus.contains(*w)).count();
        Self {
            matched,
            total: words.len(),
        }
    }

    /// `matched / total`, or 0 for a topic with no words.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

/// Lowercased concatenation of every answer and question.
pub fn build_corpus(pairs: &[QaPair]) -> String {
    pairs
        .iter()
        .map(|p| format!("{} {}", p.answer, p.question))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score every topic against the pairs, one record per topic in input order.
pub fn score_topics(topics: &[Topic], pairs: &[QaPair], jitter: &dyn Jitter) -> Vec<UnderstandingRecord> {
    let corpus = build_corpus(pairs);
    topics
        .iter()
        .map(|topic| score_with_coverage(topic, KeywordCoverage::measure(topic, &corpus), jitter))
        .collect()
}

/// Turn a coverage measurement into a clamped record.
pub fn score_with_coverage(topic: &str, coverage: KeywordCoverage, jitter: &dyn Jitter) -> UnderstandingRecord {
    let ratio = coverage.ratio();
    let base = (ratio * 100.0).min(100.0);
    let score = base + jitter.sample();
    let confidence = (ratio + CONFIDENCE_FLOOR).min(1.0);
    UnderstandingRecord::new(
        topic,
        score,
        confidence,
        format!(
            "Found {}/{} topic keywords in answers",
            coverage.matched, coverage.total
        ),
    )
}

/// Keyword-coverage scorer that needs no external service.
#[derive(Clone)]
pub struct HeuristicScorer {
    jitter: Arc<dyn Jitter>,
}

impl HeuristicScorer {
    pub fn new(jitter: Arc<dyn Jitter>) -> Self {
        Self { jitter }
    }

    /// Score synchronously; shared by the remote scorer's fallback.
    pub fn score_now(&self, topics: &[Topic], pairs: &[QaPair]) -> Vec<UnderstandingRecord> {
        score_topics(topics, pairs, self.jitter.as_ref())
    }
}

#[async_trait]
impl UnderstandingScorer for HeuristicScorer {
    async fn score(&self, topics: &[Topic], pairs: &[QaPair]) -> Vec<UnderstandingRecord> {
        self.score_now(topics, pairs)
    }
}
