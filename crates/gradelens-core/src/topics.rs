//! Heuristic topic extraction from syllabus text.

use async_trait::async_trait;

use crate::model::{Topic, MAX_TOPICS, MAX_TOPIC_CHARS};
use crate::patterns::PatternLibrary;
use crate::traits::TopicExtractor;

const MIN_LINE_CHARS: usize = 5;
const MAX_SECTIONS: usize = 20;
const SECTION_HEAD_MIN_CHARS: usize = 10;
const SECTION_HEAD_MAX_CHARS: usize = 80;

/// Extract an ordered, deduplicated list of at most 15 topics.
///
/// Lines of 5–100 characters are tested against the library's topic
/// patterns in priority order. When no line matches, the first line of each
/// of the first 20 blank-line separated sections is used instead, provided it
/// is between 10 and 80 characters long (exclusive).
pub fn extract_topics(patterns: &PatternLibrary, text: &str) -> Vec<Topic> {
    let mut topics: Vec<Topic> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let len = line.chars().count();
        if !(MIN_LINE_CHARS..=MAX_TOPIC_CHARS).contains(&len) {
            continue;
        }

        let Some(captured) = patterns.topic_patterns().iter().find_map(|p| p.capture(line)) else {
            continue;
        };
        let topic = captured.trim_matches(|c: char| c == ':' || c == '-').trim();
        push_unique(&mut topics, topic);
    }

    if topics.is_empty() {
        tracing::debug!("no patterned topic lines, falling back to section headings");
        for section in patterns.sections(text).take(MAX_SECTIONS) {
            let head = section.lines().next().unwrap_or("").trim();
            let len = head.chars().count();
            if len > SECTION_HEAD_MIN_CHARS && len < SECTION_HEAD_MAX_CHARS {
                push_unique(&mut topics, head);
            }
        }
    }

    topics.truncate(MAX_TOPICS);
    topics
}

/// Apply the topic invariants to labels from an untrusted source: trimmed,
/// non-empty, at most 100 characters, unique, at most 15.
pub fn normalize_topics<I, S>(labels: I) -> Vec<Topic>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut topics = Vec::new();
    for label in labels {
        let label = label.as_ref().trim();
        if label.chars().count() > MAX_TOPIC_CHARS {
            continue;
        }
        push_unique(&mut topics, label);
        if topics.len() == MAX_TOPICS {
            break;
        }
    }
    topics
}

/// Pattern-based topic extraction that needs no external service.
#[derive(Debug, Clone, Default)]
pub struct HeuristicTopicExtractor {
    patterns: PatternLibrary,
}

impl HeuristicTopicExtractor {
    pub fn new(patterns: PatternLibrary) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl TopicExtractor for HeuristicTopicExtractor {
    async fn extract(&self, text: &str) -> Vec<Topic> {
        extract_topics(&self.patterns, text)
    }
}

fn push_unique(topics: &mut Vec<Topic>, topic: &str) {
    if !topic.is_empty() && !topics.iter().any(|t| t == topic) {
        topics.push(topic.to_string());
    }
}
