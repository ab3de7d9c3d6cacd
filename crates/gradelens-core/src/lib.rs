//! gradelens-core — Text-analysis pipeline, scoring, and dashboard statistics.
//!
//! This crate turns a syllabus and a student's answer sheet (plain text) into
//! topics, question/answer pairs and per-topic understanding records, and
//! aggregates stored records into teacher and student dashboards.

pub mod engine;
pub mod error;
pub mod gradebook;
pub mod model;
pub mod patterns;
pub mod remote;
pub mod report;
pub mod scoring;
pub mod segment;
pub mod statistics;
pub mod topics;
pub mod traits;
