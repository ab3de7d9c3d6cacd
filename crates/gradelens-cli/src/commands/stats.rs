//! The `gradelens stats` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradelens_core::gradebook::Gradebook;
use gradelens_core::statistics::{self, classify, Standing};
use gradelens_providers::load_config_from;

pub fn overview(
    gradebook_path: PathBuf,
    teacher_id: u64,
    recent: Option<usize>,
    config_path: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let gradebook = Gradebook::load_json(&gradebook_path)?;
    let limit = match recent {
        Some(n) => n,
        None => load_config_from(config_path.as_deref())?.analysis.recent_uploads_limit,
    };
    let overview = statistics::teacher_overview(&gradebook, teacher_id, limit)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("Teacher: {} ({})", overview.teacher_name, overview.teacher_id);
    match overview.syllabus_id {
        Some(id) => println!("Syllabus: {id}"),
        None => println!("Syllabus: none uploaded"),
    }
    println!(
        "Students: {}  Topics: {}  Average understanding: {:.1}  Pending: {}",
        overview.total_students, overview.topics_analyzed, overview.average_understanding, overview.pending_analysis
    );

    if !overview.topic_statistics.is_empty() {
        let mut table = Table::new();
        let mut header = vec!["Topic".to_string(), "Average".to_string()];
        if let Some(first) = overview.topic_statistics.first() {
            header.extend(first.student_scores.iter().map(|s| s.name.clone()));
        }
        table.set_header(header);

        for stat in &overview.topic_statistics {
            let mut row = vec![Cell::new(&stat.topic), Cell::new(format!("{:.1}", stat.average))];
            row.extend(stat.student_scores.iter().map(|s| Cell::new(format!("{:.1}", s.average))));
            table.add_row(row);
        }
        println!("\n{table}");
    }

    if !overview.recent_uploads.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Sheet", "Student", "File", "Status", "Uploaded"]);
        for upload in &overview.recent_uploads {
            table.add_row(vec![
                Cell::new(upload.id),
                Cell::new(&upload.student_name),
                Cell::new(&upload.file_name),
                Cell::new(upload.status),
                Cell::new(upload.upload_date.format("%Y-%m-%d %H:%M")),
            ]);
        }
        println!("\nRecent uploads:\n{table}");
    }

    Ok(())
}

pub fn student(gradebook_path: PathBuf, student_id: u64, format: String) -> Result<()> {
    let gradebook = Gradebook::load_json(&gradebook_path)?;
    let performance = statistics::student_performance(&gradebook, student_id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&performance)?);
        return Ok(());
    }

    println!("Student: {} ({})", performance.student_name, performance.student_id);
    println!("Overall average: {:.1}", performance.overall_average);

    if !performance.topic_scores.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Topic", "Score", "Class average", "Standing"]);
        for (topic, score) in &performance.topic_scores {
            let class = performance.class_averages.get(topic).copied().unwrap_or_default();
            table.add_row(vec![
                Cell::new(topic),
                Cell::new(format!("{score:.1}")),
                Cell::new(format!("{class:.1}")),
                Cell::new(standing_label(classify(*score))),
            ]);
        }
        println!("\n{table}");
    }

    print_topic_list("Strong topics", &performance.strong_topics);
    print_topic_list("Weak topics", &performance.weak_topics);
    print_topic_list("Not yet graded", &performance.ungraded_topics);

    Ok(())
}

pub fn comparison(gradebook_path: PathBuf, teacher_id: u64, format: String) -> Result<()> {
    let gradebook = Gradebook::load_json(&gradebook_path)?;
    let comparison = statistics::topic_comparison(&gradebook, teacher_id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    if comparison.data.is_empty() {
        println!("No syllabus topics for teacher {teacher_id}.");
        return Ok(());
    }

    let mut names: Vec<&String> = Vec::new();
    for name in &comparison.students {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut table = Table::new();
    let mut header = vec!["Topic".to_string(), "Average".to_string()];
    header.extend(names.iter().map(|n| n.to_string()));
    table.set_header(header);

    for row in &comparison.data {
        let mut cells = vec![Cell::new(&row.topic), Cell::new(format!("{:.1}", row.average))];
        cells.extend(names.iter().map(|name| match row.by_first_name.get(*name) {
            Some(score) => Cell::new(format!("{score:.1}")),
            None => Cell::new("-"),
        }));
        table.add_row(cells);
    }
    println!("{table}");

    Ok(())
}

fn standing_label(standing: Standing) -> &'static str {
    match standing {
        Standing::Strong => "strong",
        Standing::Weak => "weak",
        Standing::Neutral => "",
    }
}

fn print_topic_list(label: &str, topics: &[String]) {
    if !topics.is_empty() {
        println!("\n{label}: {}", topics.join(", "));
    }
}
