//! The `gradelens validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradelens_core::gradebook::Gradebook;

pub fn execute(gradebook_path: PathBuf) -> Result<()> {
    let gradebook = Gradebook::load_json(&gradebook_path)?;

    println!(
        "Gradebook: {} teacher(s), {} student(s), {} syllabi, {} answer sheet(s), {} analysis record(s)",
        gradebook.teachers.len(),
        gradebook.students.len(),
        gradebook.syllabi.len(),
        gradebook.answer_sheets.len(),
        gradebook.analyses.len()
    );

    let warnings = gradebook.validate();
    for w in &warnings {
        let prefix = w
            .subject
            .as_ref()
            .map(|s| format!("  [{s}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Gradebook valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
