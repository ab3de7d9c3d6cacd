//! The `gradelens ingest` commands.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use gradelens_core::gradebook::Gradebook;
use gradelens_core::model::SheetStatus;

use super::{file_name, read_text, PipelineOptions};

pub async fn syllabus(gradebook_path: PathBuf, teacher_id: u64, file: PathBuf, options: PipelineOptions) -> Result<()> {
    let mut gradebook = Gradebook::load_json(&gradebook_path)?;
    let text = read_text(&file)?;
    let (analyzer, _) = options.build()?;

    let topics = analyzer.extract_topics(&text).await;
    let topic_count = topics.len();
    let id = gradebook.ingest_syllabus(teacher_id, topics, Utc::now())?;
    gradebook.save_json(&gradebook_path)?;

    println!("Stored syllabus {id} with {topic_count} topic(s)");
    Ok(())
}

/// Segment a sheet, score it against the most recent syllabus, and store the outcome.
pub async fn answers(gradebook_path: PathBuf, student_id: u64, file: PathBuf, options: PipelineOptions) -> Result<()> {
    let mut gradebook = Gradebook::load_json(&gradebook_path)?;
    let text = read_text(&file)?;
    let (analyzer, _) = options.build()?;

    let pairs = analyzer.segment(&text).await;
    let sheet_id = gradebook.ingest_answer_sheet(student_id, file_name(&file), pairs.clone(), Utc::now())?;

    let (syllabus_id, topics) = match gradebook.latest_syllabus() {
        Some(s) => (Some(s.id), s.topics.clone()),
        None => (None, Vec::new()),
    };
    let outcome = analyzer.process_answer_sheet(&topics, &pairs).await;
    gradebook.apply_outcome(sheet_id, syllabus_id, &outcome, Utc::now())?;
    gradebook.save_json(&gradebook_path)?;

    match outcome.status {
        SheetStatus::Processed => println!(
            "Answer sheet {sheet_id} processed: {} pair(s), {} topic record(s)",
            pairs.len(),
            outcome.records.len()
        ),
        status => println!(
            "Answer sheet {sheet_id} {status}: {}",
            outcome.reason.as_deref().unwrap_or("no details")
        ),
    }
    Ok(())
}
