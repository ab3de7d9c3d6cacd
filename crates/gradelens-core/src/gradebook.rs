//! Gradebook snapshots: the record set handed to the statistics layer.
//!
//! A gradebook is a JSON export of the external store (teachers, students,
//! syllabi, answer sheets and stored analyses). It can be loaded, validated,
//! extended with newly ingested documents, and saved back.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SheetOutcome;
use crate::error::StatsError;
use crate::model::{
    AnswerSheet, QaPair, SheetStatus, StoredAnalysis, Student, Syllabus, Teacher, Topic,
};

/// Every record the dashboards are computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gradebook {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub syllabi: Vec<Syllabus>,
    #[serde(default)]
    pub answer_sheets: Vec<AnswerSheet>,
    #[serde(default)]
    pub analyses: Vec<StoredAnalysis>,
}

impl Gradebook {
    /// Load a gradebook from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read gradebook: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse gradebook: {}", path.display()))
    }

    /// Parse a gradebook from a JSON string (useful for testing).
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid gradebook JSON")
    }

    /// Save the gradebook as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize gradebook")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write gradebook to {}", path.display()))
    }

    pub fn teacher(&self, id: u64) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    pub fn student(&self, id: u64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn answer_sheet(&self, id: u64) -> Option<&AnswerSheet> {
        self.answer_sheets.iter().find(|s| s.id == id)
    }

    /// The most recently created syllabus of any teacher.
    ///
    /// New answer sheets are always scored against this one.
    pub fn latest_syllabus(&self) -> Option<&Syllabus> {
        self.syllabi.iter().max_by_key(|s| (s.created_at, s.id))
    }

    /// The most recently created syllabus of one teacher.
    pub fn latest_syllabus_for(&self, teacher_id: u64) -> Option<&Syllabus> {
        self.syllabi
            .iter()
            .filter(|s| s.teacher_id == teacher_id)
            .max_by_key(|s| (s.created_at, s.id))
    }

    /// Stored analyses paired with the id of the student who wrote the sheet.
    ///
    /// Analyses whose answer sheet is unknown are skipped.
    pub fn analyses_with_student(&self) -> impl Iterator<Item = (u64, &StoredAnalysis)> + '_ {
        let owners: BTreeMap<u64, u64> = self
            .answer_sheets
            .iter()
            .map(|s| (s.id, s.student_id))
            .collect();
        self.analyses
            .iter()
            .filter_map(move |a| owners.get(&a.answer_sheet_id).map(|&student| (student, a)))
    }

    /// Store a syllabus with its extracted topics.
    pub fn ingest_syllabus(
        &mut self,
        teacher_id: u64,
        topics: Vec<Topic>,
        created_at: DateTime<Utc>,
    ) -> Result<u64, StatsError> {
        if self.teacher(teacher_id).is_none() {
            return Err(StatsError::TeacherNotFound(teacher_id));
        }
        let id = next_id(self.syllabi.iter().map(|s| s.id));
        self.syllabi.push(Syllabus {
            id,
            teacher_id,
            topics,
            created_at,
        });
        Ok(id)
    }

    /// Store an uploaded answer sheet in the `processing` state.
    pub fn ingest_answer_sheet(
        &mut self,
        student_id: u64,
        file_name: impl Into<String>,
        qa_pairs: Vec<QaPair>,
        created_at: DateTime<Utc>,
    ) -> Result<u64, StatsError> {
        if self.student(student_id).is_none() {
            return Err(StatsError::StudentNotFound(student_id));
        }
        let id = next_id(self.answer_sheets.iter().map(|s| s.id));
        self.answer_sheets.push(AnswerSheet {
            id,
            student_id,
            file_name: file_name.into(),
            status: SheetStatus::Processing,
            qa_pairs,
            created_at,
            processed_at: None,
        });
        Ok(id)
    }

    /// Record the outcome of analyzing a sheet.
    ///
    /// Records are stored only for processed sheets, linked to `syllabus_id`.
    pub fn apply_outcome(
        &mut self,
        sheet_id: u64,
        syllabus_id: Option<u64>,
        outcome: &SheetOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), StatsError> {
        let sheet = self
            .answer_sheets
            .iter_mut()
            .find(|s| s.id == sheet_id)
            .ok_or(StatsError::AnswerSheetNotFound(sheet_id))?;

        sheet.status = outcome.status;
        if outcome.status != SheetStatus::Processed {
            return Ok(());
        }
        sheet.processed_at = Some(now);

        let Some(syllabus_id) = syllabus_id else {
            return Ok(());
        };
        self.analyses.extend(outcome.records.iter().map(|record| StoredAnalysis {
            answer_sheet_id: sheet_id,
            syllabus_id,
            record: record.clone(),
            created_at: now,
        }));
        Ok(())
    }

    /// Check the snapshot for common issues.
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        duplicate_ids("teacher", self.teachers.iter().map(|t| t.id), &mut warnings);
        duplicate_ids("student", self.students.iter().map(|s| s.id), &mut warnings);
        duplicate_ids("syllabus", self.syllabi.iter().map(|s| s.id), &mut warnings);
        duplicate_ids("answer sheet", self.answer_sheets.iter().map(|s| s.id), &mut warnings);

        for syllabus in &self.syllabi {
            if self.teacher(syllabus.teacher_id).is_none() {
                warnings.push(ValidationWarning::about(
                    format!("syllabus {}", syllabus.id),
                    format!("unknown teacher {}", syllabus.teacher_id),
                ));
            }
            if syllabus.topics.is_empty() {
                warnings.push(ValidationWarning::about(
                    format!("syllabus {}", syllabus.id),
                    "no topics; answer sheets scored against it will fail",
                ));
            }
        }

        for sheet in &self.answer_sheets {
            if self.student(sheet.student_id).is_none() {
                warnings.push(ValidationWarning::about(
                    format!("answer sheet {}", sheet.id),
                    format!("unknown student {}", sheet.student_id),
                ));
            }
        }

        let syllabus_ids: HashSet<u64> = self.syllabi.iter().map(|s| s.id).collect();
        for (i, analysis) in self.analyses.iter().enumerate() {
            let subject = format!("analysis #{i}");
            if self.answer_sheet(analysis.answer_sheet_id).is_none() {
                warnings.push(ValidationWarning::about(
                    subject.clone(),
                    format!("unknown answer sheet {}", analysis.answer_sheet_id),
                ));
            }
            if !syllabus_ids.contains(&analysis.syllabus_id) {
                warnings.push(ValidationWarning::about(
                    subject.clone(),
                    format!("unknown syllabus {}", analysis.syllabus_id),
                ));
            }
            let r = &analysis.record;
            if !(0.0..=100.0).contains(&r.score) {
                warnings.push(ValidationWarning::about(
                    subject.clone(),
                    format!("score {} for '{}' is outside 0-100", r.score, r.topic),
                ));
            }
            if !(0.0..=1.0).contains(&r.confidence) {
                warnings.push(ValidationWarning::about(
                    subject,
                    format!("confidence {} for '{}' is outside 0-1", r.confidence, r.topic),
                ));
            }
        }

        let mut by_first_name: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for student in &self.students {
            by_first_name.entry(student.first_name()).or_default().push(student.id);
        }
        for (first_name, ids) in by_first_name.into_iter().filter(|(_, ids)| ids.len() > 1) {
            let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
            warnings.push(ValidationWarning {
                subject: None,
                message: format!(
                    "students {} share the first name '{first_name}' and collide in topic comparison",
                    ids.join(", ")
                ),
            });
        }

        warnings
    }
}

/// A warning from gradebook validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The record the warning is about (if applicable).
    pub subject: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn about(subject: String, message: impl Into<String>) -> Self {
        Self {
            subject: Some(subject),
            message: message.into(),
        }
    }
}

fn duplicate_ids(kind: &str, ids: impl Iterator<Item = u64>, warnings: &mut Vec<ValidationWarning>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            warnings.push(ValidationWarning {
                subject: Some(format!("{kind} {id}")),
                message: format!("duplicate {kind} ID: {id}"),
            });
        }
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().map_or(1, |max| max + 1)
}
