//! Ordered text patterns used by the heuristic extractors.
//!
//! Order matters: the first topic pattern that matches a line wins, and the
//! first question family that yields a usable pair wins.

use regex::Regex;

const NUMBERED_LINE: &str = r"^\d+[.)]\s*(.+)$";
const BULLETED_LINE: &str = r"^[-*]\s*(.+)$";
const TITLE_CASE_LINE: &str = r"^[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*:?\s*$";

const QUESTION_MARKER: &str = r"(?im)^[ \t]*(?:question|q)[ \t]*\d+[ \t]*[.):][ \t]*(.+)$";
const NUMBERED_ITEM: &str = r"(?m)^[ \t]*\d+[.)][ \t]*(.+)$";

/// A label needs a separator; a bare "A 3-by-3 ..." is answer text.
const ANSWER_LABEL: &str = r"(?i)^\s*(?:answer|ans|a)[ \t]*\d*[ \t]*[.):][ \t]*";
const BLANK_LINE: &str = r"\n\s*\n";

/// A single line-level pattern that may name a topic.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    name: &'static str,
    regex: Regex,
}

impl TopicPattern {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Match a trimmed line, returning the first capture group or, for
    /// patterns without one, the whole line.
    pub fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        let caps = self.regex.captures(line)?;
        Some(caps.get(1).map_or(line, |m| m.as_str()))
    }
}

/// A family of markers that introduce questions in an answer sheet.
#[derive(Debug, Clone)]
pub struct MarkerFamily {
    name: &'static str,
    regex: Regex,
}

impl MarkerFamily {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Every marker in `text`, in order of appearance.
    pub fn markers<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Marker<'a>> + 'a {
        self.regex.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            let question = caps.get(1)?;
            Some(Marker {
                start: whole.start(),
                end: whole.end(),
                question: question.as_str(),
            })
        })
    }
}

/// One question marker located in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Byte offset where the marker line begins.
    pub start: usize,
    /// Byte offset just past the question text.
    pub end: usize,
    pub question: &'a str,
}

/// The complete, ordered pattern set.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    topic_patterns: Vec<TopicPattern>,
    question_families: Vec<MarkerFamily>,
    answer_label: Regex,
    blank_line: Regex,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self {
            topic_patterns: vec![
                TopicPattern {
                    name: "numbered",
                    regex: compile(NUMBERED_LINE),
                },
                TopicPattern {
                    name: "bulleted",
                    regex: compile(BULLETED_LINE),
                },
                TopicPattern {
                    name: "title-case",
                    regex: compile(TITLE_CASE_LINE),
                },
            ],
            question_families: vec![
                MarkerFamily {
                    name: "question-marker",
                    regex: compile(QUESTION_MARKER),
                },
                MarkerFamily {
                    name: "numbered-item",
                    regex: compile(NUMBERED_ITEM),
                },
            ],
            answer_label: compile(ANSWER_LABEL),
            blank_line: compile(BLANK_LINE),
        }
    }

    /// Topic patterns in priority order.
    pub fn topic_patterns(&self) -> &[TopicPattern] {
        &self.topic_patterns
    }

    /// Question marker families in priority order.
    pub fn question_families(&self) -> &[MarkerFamily] {
        &self.question_families
    }

    /// Strip a leading "Answer N:" / "A:" label from an answer span.
    pub fn strip_answer_label<'a>(&self, span: &'a str) -> &'a str {
        match self.answer_label.find(span) {
            Some(m) => &span[m.end()..],
            None => span,
        }
    }

    /// Split text into blank-line separated sections.
    pub fn sections<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.blank_line.split(text)
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match<'a>(lib: &PatternLibrary, line: &'a str) -> Option<(&'static str, &'a str)> {
        lib.topic_patterns()
            .iter()
            .find_map(|p| p.capture(line).map(|c| (p.name(), c)))
    }

    #[test]
    fn numbered_wins_over_title_case() {
        let lib = PatternLibrary::new();
        assert_eq!(first_match(&lib, "1. Linear Algebra"), Some(("numbered", "Linear Algebra")));
        assert_eq!(first_match(&lib, "2) Calculus"), Some(("numbered", "Calculus")));
    }

    #[test]
    fn bullets_and_headings() {
        let lib = PatternLibrary::new();
        assert_eq!(first_match(&lib, "- Probability"), Some(("bulleted", "Probability")));
        assert_eq!(first_match(&lib, "* Set theory"), Some(("bulleted", "Set theory")));
        assert_eq!(
            first_match(&lib, "Course Overview:"),
            Some(("title-case", "Course Overview:"))
        );
        assert_eq!(first_match(&lib, "this line is plain prose"), None);
        assert_eq!(first_match(&lib, "Mixed case Heading"), None);
    }

    #[test]
    fn question_markers_are_case_insensitive() {
        let lib = PatternLibrary::new();
        let family = &lib.question_families()[0];
        let text = "Question 1: What is 2+2?\nAnswer 1: Four.\nq2) Name a prime\n";
        let markers: Vec<_> = family.markers(text).collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].question, "What is 2+2?");
        assert_eq!(markers[1].question, "Name a prime");
    }

    #[test]
    fn answer_markers_are_not_questions() {
        let lib = PatternLibrary::new();
        let family = &lib.question_families()[0];
        assert_eq!(family.markers("Answer 1: Four.").count(), 0);
    }

    #[test]
    fn strips_answer_labels_only_when_labelled() {
        let lib = PatternLibrary::new();
        assert_eq!(lib.strip_answer_label("\nAnswer 1: Four."), "Four.");
        assert_eq!(lib.strip_answer_label("A: yes"), "yes");
        assert_eq!(lib.strip_answer_label("Ans. maybe"), "maybe");
        assert_eq!(lib.strip_answer_label("A variable holds a value"), "A variable holds a value");
        assert_eq!(lib.strip_answer_label("A 3-by-3 matrix"), "A 3-by-3 matrix");
        assert_eq!(lib.strip_answer_label("Answer 2 - maybe"), "Answer 2 - maybe");
    }

    #[test]
    fn sections_split_on_blank_lines() {
        let lib = PatternLibrary::new();
        let sections: Vec<_> = lib.sections("one\ntwo\n\n  \nthree\n\nfour").collect();
        assert_eq!(sections, vec!["one\ntwo", "three", "four"]);
    }
}
