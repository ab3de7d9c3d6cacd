//! Heuristic question/answer segmentation of answer-sheet text.

use async_trait::async_trait;

use crate::model::{QaPair, MAX_QA_PAIRS};
use crate::patterns::{MarkerFamily, PatternLibrary};
use crate::traits::QaSegmenter;

/// An answer span must be longer than this (trimmed, in characters) to be kept.
///
/// The length is measured before the "Answer N:" label is stripped, so the
/// label counts toward it: "Answer 1: Four." is kept.
const MIN_ANSWER_SPAN_CHARS: usize = 10;
/// Paragraphs this short or shorter are ignored by the paragraph fallback.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Split answer-sheet text into at most 20 question/answer pairs.
///
/// Marker families are tried in priority order; the first one that yields a
/// usable pair wins. Each answer runs from the end of its question line to
/// the next marker of the same family, with any leading "Answer N:" label
/// removed. If no family produces a pair, consecutive paragraphs are paired
/// up instead.
pub fn segment_pairs(patterns: &PatternLibrary, text: &str) -> Vec<QaPair> {
    for family in patterns.question_families() {
        let pairs = pairs_for_family(patterns, family, text);
        if !pairs.is_empty() {
            tracing::debug!(family = family.name(), pairs = pairs.len(), "segmented answer sheet");
            return pairs;
        }
    }

    let pairs = paragraph_pairs(patterns, text);
    tracing::debug!(pairs = pairs.len(), "segmented answer sheet by paragraphs");
    pairs
}

/// Pattern-based segmentation that needs no external service.
#[derive(Debug, Clone, Default)]
pub struct HeuristicSegmenter {
    patterns: PatternLibrary,
}

impl HeuristicSegmenter {
    pub fn new(patterns: PatternLibrary) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl QaSegmenter for HeuristicSegmenter {
    async fn segment(&self, text: &str) -> Vec<QaPair> {
        segment_pairs(&self.patterns, text)
    }
}

fn pairs_for_family(patterns: &PatternLibrary, family: &MarkerFamily, text: &str) -> Vec<QaPair> {
    let markers: Vec<_> = family.markers(text).collect();
    let mut pairs = Vec::new();

    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |next| next.start);
        let span = &text[marker.end..end];
        if span.trim().chars().count() <= MIN_ANSWER_SPAN_CHARS {
            continue;
        }

        let answer = patterns.strip_answer_label(span);
        if let Some(pair) = QaPair::bounded(marker.question, answer) {
            pairs.push(pair);
        }
        if pairs.len() == MAX_QA_PAIRS {
            break;
        }
    }

    pairs
}

fn paragraph_pairs(patterns: &PatternLibrary, text: &str) -> Vec<QaPair> {
    let paragraphs: Vec<&str> = patterns
        .sections(text)
        .map(str::trim)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect();

    paragraphs
        .chunks_exact(2)
        .filter_map(|chunk| QaPair::bounded(chunk[0], chunk[1]))
        .take(MAX_QA_PAIRS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MAX_ANSWER_CHARS, MAX_QUESTION_CHARS};

    fn segment(text: &str) -> Vec<QaPair> {
        segment_pairs(&PatternLibrary::new(), text)
    }

    #[test]
    fn explicit_question_and_answer_markers() {
        let pairs = segment("Question 1: What is 2+2?\nAnswer 1: Four.");
        assert_eq!(
            pairs,
            vec![QaPair {
                question: "What is 2+2?".into(),
                answer: "Four.".into()
            }]
        );
    }

    #[test]
    fn abbreviated_markers_and_multiline_answers() {
        let text = "Q1. Define a group.\nA set with an associative operation,\nan identity and inverses.\n\nQ2) What is a ring?\nA2: A group under addition with a second operation.";
        let pairs = segment(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "Define a group.");
        assert_eq!(
            pairs[0].answer,
            "A set with an associative operation,\nan identity and inverses."
        );
        assert_eq!(pairs[1].question, "What is a ring?");
        assert_eq!(pairs[1].answer, "A group under addition with a second operation.");
    }

    #[test]
    fn answer_starting_with_article_and_number_is_kept_whole() {
        let pairs = segment("Question 1: Describe the identity matrix.\nA 3-by-3 identity has ones on the diagonal.");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].answer, "A 3-by-3 identity has ones on the diagonal.");
    }

    #[test]
    fn short_labelled_answer_counts_its_label() {
        let pairs = segment("Question 1: Is 7 prime?\nAnswer 1: Yes");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].answer, "Yes");
    }

    #[test]
    fn short_answers_are_dropped() {
        let text = "Q1: First?\nyes\nQ2: Second?\nThis answer is long enough to keep.";
        let pairs = segment(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Second?");
    }

    #[test]
    fn numbered_items_when_no_question_markers() {
        let text = "1. Explain photosynthesis\nPlants turn light into chemical energy.\n2. Explain respiration\nCells release energy from glucose.";
        let pairs = segment(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "Explain photosynthesis");
        assert_eq!(pairs[0].answer, "Plants turn light into chemical energy.");
        assert_eq!(pairs[1].answer, "Cells release energy from glucose.");
    }

    #[test]
    fn paragraph_fallback_pairs_consecutive_paragraphs() {
        let text = "Why is the sky blue on a clear day?\n\nBecause of Rayleigh scattering of sunlight.\n\ntiny\n\nThis trailing paragraph has no partner.";
        let pairs = segment(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "Why is the sky blue on a clear day?");
        assert_eq!(pairs[0].answer, "Because of Rayleigh scattering of sunlight.");
    }

    #[test]
    fn truncates_question_and_answer() {
        let text = format!("Q1: {}\n{}", "q".repeat(700), "a".repeat(3000));
        let pairs = segment(&text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question.chars().count(), MAX_QUESTION_CHARS);
        assert_eq!(pairs[0].answer.chars().count(), MAX_ANSWER_CHARS);
    }

    #[test]
    fn at_most_twenty_pairs() {
        let text: String = (1..=35)
            .map(|i| format!("Question {i}: Prompt number {i}?\nA reasonably long answer for item {i}.\n"))
            .collect();
        let pairs = segment(&text);
        assert_eq!(pairs.len(), MAX_QA_PAIRS);
        assert!(pairs.iter().all(|p| !p.question.is_empty() && !p.answer.is_empty()));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(segment("").is_empty());
        assert!(segment("just one short line").is_empty());
    }
}
