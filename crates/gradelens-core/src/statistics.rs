//! Dashboard projections over a gradebook.
//!
//! Every view is a pure function of the gradebook: maps are `BTreeMap`s and
//! lists follow gradebook or syllabus order, so the same input always
//! serializes to the same bytes. Known topics and students always appear,
//! with 0 when there is nothing to average.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::gradebook::Gradebook;
use crate::model::{SheetStatus, Topic};

/// A topic mean at or above this is a strength.
pub const STRONG_THRESHOLD: f64 = 80.0;
/// A topic mean below this is a weakness.
pub const WEAK_THRESHOLD: f64 = 65.0;
/// Default number of uploads shown in the teacher overview.
pub const DEFAULT_RECENT_UPLOADS: usize = 10;

/// Running arithmetic mean.
#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// The mean, or 0 for an empty set.
    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn mean_of(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut m = Mean::default();
    values.into_iter().for_each(|v| m.add(v));
    m.value()
}

/// How a student's topic mean compares to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Strong,
    Weak,
    Neutral,
}

/// Strong at 80 and above, weak below 65, neutral in between.
pub fn classify(mean: f64) -> Standing {
    if mean >= STRONG_THRESHOLD {
        Standing::Strong
    } else if mean < WEAK_THRESHOLD {
        Standing::Weak
    } else {
        Standing::Neutral
    }
}

/// Syllabus topics in order, with repeats removed.
fn unique_topics(topics: &[Topic]) -> Vec<Topic> {
    let mut out: Vec<Topic> = Vec::with_capacity(topics.len());
    for t in topics {
        if !out.contains(t) {
            out.push(t.clone());
        }
    }
    out
}

/// Means per (topic, student id) and per topic, over known students only.
struct ScoreTable {
    by_topic: BTreeMap<Topic, Mean>,
    by_topic_student: BTreeMap<(Topic, u64), Mean>,
    overall: Mean,
}

impl ScoreTable {
    fn build(gradebook: &Gradebook) -> Self {
        let mut table = Self {
            by_topic: BTreeMap::new(),
            by_topic_student: BTreeMap::new(),
            overall: Mean::default(),
        };
        for (student_id, analysis) in gradebook.analyses_with_student() {
            if gradebook.student(student_id).is_none() {
                continue;
            }
            let r = &analysis.record;
            table.by_topic.entry(r.topic.clone()).or_default().add(r.score);
            table
                .by_topic_student
                .entry((r.topic.clone(), student_id))
                .or_default()
                .add(r.score);
            table.overall.add(r.score);
        }
        table
    }

    fn topic_mean(&self, topic: &str) -> f64 {
        self.by_topic.get(topic).map_or(0.0, Mean::value)
    }

    fn student_mean(&self, topic: &str, student_id: u64) -> f64 {
        self.by_topic_student
            .get(&(topic.to_string(), student_id))
            .map_or(0.0, Mean::value)
    }
}

// ---------------------------------------------------------------------------
// Teacher overview
// ---------------------------------------------------------------------------

/// One student's mean for a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentScore {
    pub student_id: u64,
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStatistics {
    pub topic: Topic,
    pub average: f64,
    /// Every known student, in gradebook order.
    pub student_scores: Vec<StudentScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentUpload {
    pub id: u64,
    pub student_name: String,
    pub file_name: String,
    pub status: SheetStatus,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherOverview {
    pub teacher_id: u64,
    pub teacher_name: String,
    /// The syllabus the topic list was taken from, if the teacher has one.
    pub syllabus_id: Option<u64>,
    pub total_students: usize,
    pub topics_analyzed: usize,
    /// Mean over every record of every known student.
    pub average_understanding: f64,
    /// Sheets still processing among the recent uploads.
    pub pending_analysis: usize,
    pub topic_statistics: Vec<TopicStatistics>,
    pub recent_uploads: Vec<RecentUpload>,
}

/// Overview of a teacher's latest syllabus across all students.
pub fn teacher_overview(
    gradebook: &Gradebook,
    teacher_id: u64,
    recent_limit: usize,
) -> Result<TeacherOverview, StatsError> {
    let teacher = gradebook
        .teacher(teacher_id)
        .ok_or(StatsError::TeacherNotFound(teacher_id))?;
    let syllabus = gradebook.latest_syllabus_for(teacher_id);
    let topics = syllabus.map(|s| unique_topics(&s.topics)).unwrap_or_default();
    let table = ScoreTable::build(gradebook);

    let topic_statistics = topics
        .iter()
        .map(|topic| TopicStatistics {
            topic: topic.clone(),
            average: table.topic_mean(topic),
            student_scores: gradebook
                .students
                .iter()
                .map(|s| StudentScore {
                    student_id: s.id,
                    name: s.name.clone(),
                    average: table.student_mean(topic, s.id),
                })
                .collect(),
        })
        .collect();

    let mut uploads: Vec<_> = gradebook
        .answer_sheets
        .iter()
        .filter_map(|sheet| gradebook.student(sheet.student_id).map(|st| (sheet, st)))
        .collect();
    uploads.sort_by(|(a, _), (b, _)| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    uploads.truncate(recent_limit);

    let pending_analysis = uploads
        .iter()
        .filter(|(sheet, _)| sheet.status == SheetStatus::Processing)
        .count();
    let recent_uploads = uploads
        .into_iter()
        .map(|(sheet, student)| RecentUpload {
            id: sheet.id,
            student_name: student.name.clone(),
            file_name: sheet.file_name.clone(),
            status: sheet.status,
            upload_date: sheet.created_at,
        })
        .collect();

    Ok(TeacherOverview {
        teacher_id,
        teacher_name: teacher.name.clone(),
        syllabus_id: syllabus.map(|s| s.id),
        total_students: gradebook.students.len(),
        topics_analyzed: topics.len(),
        average_understanding: table.overall.value(),
        pending_analysis,
        topic_statistics,
        recent_uploads,
    })
}

// ---------------------------------------------------------------------------
// Student performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPerformance {
    pub student_id: u64,
    pub student_name: String,
    /// Mean of the per-topic means, so heavily assessed topics are not up-weighted.
    pub overall_average: f64,
    pub topic_scores: BTreeMap<Topic, f64>,
    /// Per-topic mean across every student, for each topic in `topic_scores`
    /// or `ungraded_topics`.
    pub class_averages: BTreeMap<Topic, f64>,
    pub strong_topics: Vec<Topic>,
    pub weak_topics: Vec<Topic>,
    /// Topics of the latest syllabus with no record for this student.
    pub ungraded_topics: Vec<Topic>,
}

/// One student's per-topic means against the class baseline.
pub fn student_performance(gradebook: &Gradebook, student_id: u64) -> Result<StudentPerformance, StatsError> {
    let student = gradebook
        .student(student_id)
        .ok_or(StatsError::StudentNotFound(student_id))?;

    let mut own: BTreeMap<Topic, Mean> = BTreeMap::new();
    for (_, analysis) in gradebook.analyses_with_student().filter(|(owner, _)| *owner == student_id) {
        let r = &analysis.record;
        own.entry(r.topic.clone()).or_default().add(r.score);
    }
    let class = ScoreTable::build(gradebook);

    let topic_scores: BTreeMap<Topic, f64> = own.iter().map(|(t, m)| (t.clone(), m.value())).collect();

    let ungraded_topics: Vec<Topic> = gradebook
        .latest_syllabus()
        .map(|s| unique_topics(&s.topics))
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !topic_scores.contains_key(t))
        .collect();

    // Every topic with records, plus the ungraded syllabus topics at zero.
    let class_averages = class
        .by_topic
        .keys()
        .chain(ungraded_topics.iter())
        .map(|t| (t.clone(), class.topic_mean(t)))
        .collect();

    let strong_topics = topic_scores
        .iter()
        .filter(|(_, &m)| classify(m) == Standing::Strong)
        .map(|(t, _)| t.clone())
        .collect();
    let weak_topics = topic_scores
        .iter()
        .filter(|(_, &m)| classify(m) == Standing::Weak)
        .map(|(t, _)| t.clone())
        .collect();

    Ok(StudentPerformance {
        student_id,
        student_name: student.name.clone(),
        overall_average: mean_of(topic_scores.values().copied()),
        topic_scores,
        class_averages,
        strong_topics,
        weak_topics,
        ungraded_topics,
    })
}

// ---------------------------------------------------------------------------
// Topic comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRow {
    pub topic: Topic,
    pub average: f64,
    /// Keyed by first name. Students sharing a first name collide and the
    /// later one in gradebook order wins.
    pub by_first_name: BTreeMap<String, f64>,
    pub by_student_id: BTreeMap<u64, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicComparison {
    pub teacher_id: u64,
    pub topics: Vec<Topic>,
    pub data: Vec<TopicRow>,
    /// First-name chart keys, one per student (repeats kept).
    pub students: Vec<String>,
}

/// Chart data: per-topic means broken down by student.
pub fn topic_comparison(gradebook: &Gradebook, teacher_id: u64) -> Result<TopicComparison, StatsError> {
    if gradebook.teacher(teacher_id).is_none() {
        return Err(StatsError::TeacherNotFound(teacher_id));
    }
    let topics = gradebook
        .latest_syllabus_for(teacher_id)
        .map(|s| unique_topics(&s.topics))
        .unwrap_or_default();
    let table = ScoreTable::build(gradebook);

    let data = topics
        .iter()
        .map(|topic| {
            let mut by_first_name = BTreeMap::new();
            let mut by_student_id = BTreeMap::new();
            for s in &gradebook.students {
                let mean = table.student_mean(topic, s.id);
                by_first_name.insert(s.first_name().to_string(), mean);
                by_student_id.insert(s.id, mean);
            }
            TopicRow {
                topic: topic.clone(),
                average: table.topic_mean(topic),
                by_first_name,
                by_student_id,
            }
        })
        .collect();

    Ok(TopicComparison {
        teacher_id,
        topics,
        data,
        students: gradebook
            .students
            .iter()
            .map(|s| s.first_name().to_string())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerSheet, StoredAnalysis, Student, Syllabus, Teacher, UnderstandingRecord};

    fn ts(day: u32) -> DateTime<Utc> {
        format!("2024-03-{day:02}T12:00:00Z").parse().unwrap()
    }

    fn student(id: u64, name: &str) -> Student {
        Student { id, name: name.into() }
    }

    fn sheet(id: u64, student_id: u64, status: SheetStatus, day: u32) -> AnswerSheet {
        AnswerSheet {
            id,
            student_id,
            file_name: format!("sheet-{id}.pdf"),
            status,
            qa_pairs: vec![],
            created_at: ts(day),
            processed_at: None,
        }
    }

    fn analysis(sheet_id: u64, topic: &str, score: f64) -> StoredAnalysis {
        StoredAnalysis {
            answer_sheet_id: sheet_id,
            syllabus_id: 1,
            record: UnderstandingRecord::new(topic, score, 0.8, ""),
            created_at: ts(1),
        }
    }

    fn gradebook() -> Gradebook {
        Gradebook {
            teachers: vec![Teacher {
                id: 1,
                name: "Grace Hopper".into(),
            }],
            students: vec![student(10, "Ada Lovelace"), student(11, "Alan Turing")],
            syllabi: vec![Syllabus {
                id: 1,
                teacher_id: 1,
                topics: vec!["Algebra".into(), "Geometry".into(), "Logic".into()],
                created_at: ts(1),
            }],
            answer_sheets: vec![
                sheet(100, 10, SheetStatus::Processed, 2),
                sheet(101, 10, SheetStatus::Processed, 3),
                sheet(102, 11, SheetStatus::Processed, 4),
                sheet(103, 11, SheetStatus::Processing, 5),
            ],
            analyses: vec![
                analysis(100, "Algebra", 90.0),
                analysis(101, "Algebra", 70.0),
                analysis(100, "Geometry", 60.0),
                analysis(102, "Algebra", 50.0),
                analysis(102, "History", 40.0),
            ],
        }
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(80.0), Standing::Strong);
        assert_eq!(classify(79.999), Standing::Neutral);
        assert_eq!(classify(70.0), Standing::Neutral);
        assert_eq!(classify(65.0), Standing::Neutral);
        assert_eq!(classify(64.999), Standing::Weak);
    }

    #[test]
    fn overview_fills_every_topic_and_student() {
        let ov = teacher_overview(&gradebook(), 1, DEFAULT_RECENT_UPLOADS).unwrap();
        assert_eq!(ov.total_students, 2);
        assert_eq!(ov.topics_analyzed, 3);
        assert_eq!(ov.syllabus_id, Some(1));
        assert_eq!(ov.average_understanding, 62.0);

        let algebra = &ov.topic_statistics[0];
        assert_eq!(algebra.topic, "Algebra");
        assert!((algebra.average - 70.0).abs() < 1e-9);
        assert_eq!(algebra.student_scores[0].average, 80.0);
        assert_eq!(algebra.student_scores[1].average, 50.0);

        let logic = &ov.topic_statistics[2];
        assert_eq!(logic.average, 0.0);
        assert_eq!(logic.student_scores.len(), 2);
        assert!(logic.student_scores.iter().all(|s| s.average == 0.0));
    }

    #[test]
    fn overview_recent_uploads_and_pending() {
        let ov = teacher_overview(&gradebook(), 1, 2).unwrap();
        let ids: Vec<u64> = ov.recent_uploads.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![103, 102]);
        assert_eq!(ov.pending_analysis, 1);
        assert_eq!(ov.recent_uploads[0].student_name, "Alan Turing");

        let ov = teacher_overview(&gradebook(), 1, 0).unwrap();
        assert!(ov.recent_uploads.is_empty());
        assert_eq!(ov.pending_analysis, 0);
    }

    #[test]
    fn overview_of_teacher_without_syllabus() {
        let mut gb = gradebook();
        gb.teachers.push(Teacher {
            id: 2,
            name: "New Teacher".into(),
        });
        let ov = teacher_overview(&gb, 2, 10).unwrap();
        assert_eq!(ov.syllabus_id, None);
        assert_eq!(ov.topics_analyzed, 0);
        assert!(ov.topic_statistics.is_empty());
    }

    #[test]
    fn unknown_identities() {
        let gb = gradebook();
        assert_eq!(teacher_overview(&gb, 9, 10).unwrap_err(), StatsError::TeacherNotFound(9));
        assert_eq!(student_performance(&gb, 9).unwrap_err(), StatsError::StudentNotFound(9));
        assert_eq!(topic_comparison(&gb, 9).unwrap_err(), StatsError::TeacherNotFound(9));
    }

    #[test]
    fn student_performance_uses_unweighted_topic_means() {
        let perf = student_performance(&gradebook(), 10).unwrap();
        assert_eq!(perf.topic_scores["Algebra"], 80.0);
        assert_eq!(perf.topic_scores["Geometry"], 60.0);
        // (80 + 60) / 2, not (90 + 70 + 60) / 3.
        assert_eq!(perf.overall_average, 70.0);
        assert_eq!(perf.strong_topics, vec!["Algebra"]);
        assert_eq!(perf.weak_topics, vec!["Geometry"]);
        assert_eq!(perf.ungraded_topics, vec!["Logic"]);
        assert!((perf.class_averages["Algebra"] - 70.0).abs() < 1e-9);
        assert_eq!(perf.class_averages["Logic"], 0.0);
        assert_eq!(perf.class_averages["History"], 40.0);
    }

    #[test]
    fn class_baseline_covers_topics_the_student_never_answered() {
        let mut gb = gradebook();
        gb.analyses.retain(|a| a.answer_sheet_id != 100 || a.record.topic == "Algebra");
        let perf = student_performance(&gb, 10).unwrap();
        assert_eq!(perf.topic_scores.keys().collect::<Vec<_>>(), vec!["Algebra"]);
        let topics: Vec<&str> = perf.class_averages.keys().map(String::as_str).collect();
        assert_eq!(topics, vec!["Algebra", "Geometry", "History", "Logic"]);
        assert_eq!(perf.class_averages["Geometry"], 0.0);
        assert_eq!(perf.class_averages["History"], 40.0);
    }

    #[test]
    fn class_baseline_ignores_sheets_of_unknown_students() {
        let mut gb = gradebook();
        gb.answer_sheets.push(sheet(200, 99, SheetStatus::Processed, 6));
        gb.analyses.push(analysis(200, "Algebra", 0.0));
        gb.analyses.push(analysis(200, "Optics", 10.0));

        let perf = student_performance(&gb, 10).unwrap();
        assert!((perf.class_averages["Algebra"] - 70.0).abs() < 1e-9);
        assert!(!perf.class_averages.contains_key("Optics"));

        let ov = teacher_overview(&gb, 1, DEFAULT_RECENT_UPLOADS).unwrap();
        assert!((ov.topic_statistics[0].average - 70.0).abs() < 1e-9);
    }

    #[test]
    fn student_without_records_gets_zeros() {
        let mut gb = gradebook();
        gb.students.push(student(12, "Barbara Liskov"));
        let perf = student_performance(&gb, 12).unwrap();
        assert_eq!(perf.overall_average, 0.0);
        assert!(perf.topic_scores.is_empty());
        assert!(perf.strong_topics.is_empty() && perf.weak_topics.is_empty());
        assert_eq!(perf.ungraded_topics.len(), 3);
    }

    #[test]
    fn comparison_keys_by_first_name_and_id() {
        let mut gb = gradebook();
        gb.students.push(student(12, "Ada Yonath"));
        let cmp = topic_comparison(&gb, 1).unwrap();

        assert_eq!(cmp.topics, vec!["Algebra", "Geometry", "Logic"]);
        assert_eq!(cmp.students, vec!["Ada", "Alan", "Ada"]);

        let algebra = &cmp.data[0];
        // Ada Yonath (no records) overwrote Ada Lovelace.
        assert_eq!(algebra.by_first_name["Ada"], 0.0);
        assert_eq!(algebra.by_first_name["Alan"], 50.0);
        assert_eq!(algebra.by_student_id[&10], 80.0);
        assert_eq!(algebra.by_student_id[&12], 0.0);
        assert_eq!(cmp.data[2].average, 0.0);
    }

    #[test]
    fn records_of_unknown_students_are_ignored() {
        let mut gb = gradebook();
        gb.answer_sheets.push(sheet(200, 99, SheetStatus::Processed, 6));
        gb.analyses.push(analysis(200, "Algebra", 0.0));
        let ov = teacher_overview(&gb, 1, 10).unwrap();
        assert!((ov.topic_statistics[0].average - 70.0).abs() < 1e-9);
        assert!(ov.recent_uploads.iter().all(|u| u.id != 200));
    }

    #[test]
    fn empty_gradebook_is_all_zeros() {
        let gb = Gradebook {
            teachers: vec![Teacher {
                id: 1,
                name: "T".into(),
            }],
            ..Gradebook::default()
        };
        let ov = teacher_overview(&gb, 1, 10).unwrap();
        assert_eq!(ov.average_understanding, 0.0);
        assert_eq!(ov.total_students, 0);
        let cmp = topic_comparison(&gb, 1).unwrap();
        assert!(cmp.data.is_empty() && cmp.students.is_empty());
    }

    #[test]
    fn projections_are_idempotent() {
        let gb = gradebook();
        let a = serde_json::to_string(&teacher_overview(&gb, 1, 10).unwrap()).unwrap();
        let b = serde_json::to_string(&teacher_overview(&gb, 1, 10).unwrap()).unwrap();
        assert_eq!(a, b);

        let a = serde_json::to_string(&student_performance(&gb, 10).unwrap()).unwrap();
        let b = serde_json::to_string(&student_performance(&gb, 10).unwrap()).unwrap();
        assert_eq!(a, b);

        let a = serde_json::to_string(&topic_comparison(&gb, 1).unwrap()).unwrap();
        let b = serde_json::to_string(&topic_comparison(&gb, 1).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
