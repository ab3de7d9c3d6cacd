//! Analysis report types with JSON persistence and run comparison.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::AnalysisMode;
use crate::model::{QaPair, SheetStatus, Topic, UnderstandingRecord};

/// The result of analyzing one syllabus/answer-sheet pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub mode: AnalysisMode,
    pub status: SheetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub topics: Vec<Topic>,
    pub qa_pairs: Vec<QaPair>,
    pub records: Vec<UnderstandingRecord>,
    /// Total wall-clock duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl AnalysisReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AnalysisReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Mean score per topic (a topic may be scored more than once).
    pub fn topic_scores(&self) -> BTreeMap<Topic, f64> {
        let mut sums: BTreeMap<Topic, (f64, usize)> = BTreeMap::new();
        for r in &self.records {
            let entry = sums.entry(r.topic.clone()).or_insert((0.0, 0));
            entry.0 += r.score;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(topic, (sum, n))| (topic, sum / n as f64))
            .collect()
    }

    /// Compare this report against an earlier one for the same student.
    ///
    /// Topics whose score moved by more than `threshold` points are reported
    /// as regressions or improvements.
    pub fn compare(&self, baseline: &AnalysisReport, threshold: f64) -> RunComparison {
        let baseline_scores = baseline.topic_scores();
        let current_scores = self.topic_scores();

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_topics = Vec::new();

        for (topic, &current) in &current_scores {
            let Some(&before) = baseline_scores.get(topic) else {
                new_topics.push(topic.clone());
                continue;
            };
            let change = ScoreChange {
                topic: topic.clone(),
                baseline_score: before,
                current_score: current,
                delta: current - before,
            };
            if change.delta < -threshold {
                regressions.push(change);
            } else if change.delta > threshold {
                improvements.push(change);
            } else {
                unchanged += 1;
            }
        }

        let removed_topics = baseline_scores
            .keys()
            .filter(|t| !current_scores.contains_key(*t))
            .cloned()
            .collect();

        RunComparison {
            regressions,
            improvements,
            unchanged,
            new_topics,
            removed_topics,
        }
    }
}

/// Result of comparing two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunComparison {
    /// Topics whose score went down.
    pub regressions: Vec<ScoreChange>,
    /// Topics whose score went up.
    pub improvements: Vec<ScoreChange>,
    /// Topics with no significant change.
    pub unchanged: usize,
    /// Topics scored now but not in the baseline.
    pub new_topics: Vec<Topic>,
    /// Topics scored in the baseline but not now.
    pub removed_topics: Vec<Topic>,
}

/// A significant per-topic score movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreChange {
    pub topic: Topic,
    pub baseline_score: f64,
    pub current_score: f64,
    pub delta: f64,
}

impl RunComparison {
    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        for (title, changes) in [("Regressions", &self.regressions), ("Improvements", &self.improvements)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Topic | Baseline | Current | Delta |\n");
            md.push_str("|-------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1} | {:.1} | {:+.1} |\n",
                    c.topic, c.baseline_score, c.current_score, c.delta
                ));
            }
            md.push('\n');
        }

        if !self.new_topics.is_empty() {
            md.push_str(&format!("New topics: {}\n", self.new_topics.join(", ")));
        }
        if !self.removed_topics.is_empty() {
            md.push_str(&format!("Removed topics: {}\n", self.removed_topics.join(", ")));
        }

        md
    }

    /// Returns true if any topic got worse.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(scores: &[(&str, f64)]) -> AnalysisReport {
        AnalysisReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            mode: AnalysisMode::Heuristic,
            status: SheetStatus::Processed,
            reason: None,
            topics: scores.iter().map(|(t, _)| t.to_string()).collect(),
            qa_pairs: vec![],
            records: scores
                .iter()
                .map(|(t, s)| UnderstandingRecord::new(*t, *s, 0.5, ""))
                .collect(),
            duration_ms: 0,
        }
    }

    #[test]
    fn compare_identical_reports() {
        let baseline = make_report(&[("Algebra", 80.0)]);
        let current = make_report(&[("Algebra", 80.0)]);

        let cmp = current.compare(&baseline, 5.0);
        assert!(cmp.regressions.is_empty());
        assert!(cmp.improvements.is_empty());
        assert_eq!(cmp.unchanged, 1);
    }

    #[test]
    fn compare_with_regression_and_improvement() {
        let baseline = make_report(&[("Algebra", 80.0), ("Geometry", 40.0), ("Logic", 50.0)]);
        let current = make_report(&[("Algebra", 60.0), ("Geometry", 70.0), ("Logic", 53.0)]);

        let cmp = current.compare(&baseline, 5.0);
        assert_eq!(cmp.regressions.len(), 1);
        assert_eq!(cmp.regressions[0].topic, "Algebra");
        assert_eq!(cmp.regressions[0].delta, -20.0);
        assert_eq!(cmp.improvements[0].topic, "Geometry");
        assert_eq!(cmp.unchanged, 1);
        assert!(cmp.has_regressions());
    }

    #[test]
    fn compare_with_new_and_removed() {
        let baseline = make_report(&[("Optics", 50.0)]);
        let current = make_report(&[("Waves", 50.0)]);

        let cmp = current.compare(&baseline, 5.0);
        assert_eq!(cmp.new_topics, vec!["Waves"]);
        assert_eq!(cmp.removed_topics, vec!["Optics"]);
    }

    #[test]
    fn repeated_topics_are_averaged() {
        let report = make_report(&[("Sets", 40.0), ("Sets", 60.0)]);
        assert_eq!(report.topic_scores()["Sets"], 50.0);
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report(&[("Algebra", 91.5)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        report.save_json(&path).unwrap();
        let loaded = AnalysisReport::load_json(&path).unwrap();

        assert_eq!(loaded.records, report.records);
        assert_eq!(loaded.mode, AnalysisMode::Heuristic);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"understanding_score\": 91.5"));
    }

    #[test]
    fn load_missing_file_has_context() {
        let err = AnalysisReport::load_json(Path::new("/nonexistent/report.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read report"));
    }

    #[test]
    fn markdown_output() {
        let baseline = make_report(&[("Algebra", 80.0)]);
        let current = make_report(&[("Algebra", 60.0), ("Probability", 70.0)]);

        let md = current.compare(&baseline, 5.0).to_markdown();
        assert!(md.contains("### Regressions"));
        assert!(md.contains("| Algebra | 80.0 | 60.0 | -20.0 |"));
        assert!(md.contains("New topics: Probability"));
    }
}
