//! The `gradelens analyze`, `topics` and `segment` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradelens_core::model::{truncate_chars, SheetStatus};
use gradelens_core::report::AnalysisReport;

use super::{read_text, PipelineOptions};

pub async fn execute(
    syllabus_path: PathBuf,
    answers_path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    options: PipelineOptions,
) -> Result<()> {
    let syllabus_text = read_text(&syllabus_path)?;
    let answer_text = read_text(&answers_path)?;
    let (analyzer, _) = options.build()?;

    let report = analyzer.analyze(&syllabus_text, &answer_text).await;

    if let Some(path) = &output {
        report.save_json(path)?;
        tracing::info!(path = %path.display(), "report saved");
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report),
    }

    Ok(())
}

pub async fn topics(syllabus_path: PathBuf, format: String, options: PipelineOptions) -> Result<()> {
    let text = read_text(&syllabus_path)?;
    let (analyzer, _) = options.build()?;
    let topics = analyzer.extract_topics(&text).await;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&topics)?),
        _ => {
            for (i, topic) in topics.iter().enumerate() {
                println!("{:>2}. {topic}", i + 1);
            }
            println!("\n{} topic(s) via {} analysis", topics.len(), analyzer.mode());
        }
    }
    Ok(())
}

pub async fn segment(answers_path: PathBuf, format: String, options: PipelineOptions) -> Result<()> {
    let text = read_text(&answers_path)?;
    let (analyzer, _) = options.build()?;
    let pairs = analyzer.segment(&text).await;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&pairs)?),
        _ => {
            for (i, pair) in pairs.iter().enumerate() {
                println!("Q{}: {}", i + 1, pair.question);
                println!("A{}: {}\n", i + 1, pair.answer);
            }
            println!("{} pair(s) via {} analysis", pairs.len(), analyzer.mode());
        }
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!("Analysis {} ({} mode)", report.id, report.mode);
    println!(
        "{} topic(s), {} question/answer pair(s), {}ms",
        report.topics.len(),
        report.qa_pairs.len(),
        report.duration_ms
    );

    if report.status == SheetStatus::Error {
        println!(
            "\nStatus: error ({})",
            report.reason.as_deref().unwrap_or("unknown")
        );
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Score", "Confidence", "Details"]);
    for record in &report.records {
        table.add_row(vec![
            Cell::new(&record.topic),
            Cell::new(format!("{:.1}", record.score)),
            Cell::new(format!("{:.2}", record.confidence)),
            Cell::new(truncate_chars(&record.details, 60)),
        ]);
    }
    println!("\n{table}");

    if !report.records.is_empty() {
        let mean = report.records.iter().map(|r| r.score).sum::<f64>() / report.records.len() as f64;
        println!("\nAverage understanding: {mean:.1}");
    }
}
