//! The `gradelens init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("gradelens.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("gradebook.json"), SAMPLE_GRADEBOOK)?;

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY (or edit gradelens.toml) to enable remote analysis");
    println!("  2. Run: gradelens ingest syllabus --gradebook gradebook.json --teacher 1 --file syllabus.txt");
    println!("  3. Run: gradelens ingest answers --gradebook gradebook.json --student 10 --file answers.txt");
    println!("  4. Run: gradelens stats overview --gradebook gradebook.json --teacher 1");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradelens configuration

# Remote analysis is used when an API key is available; otherwise the
# keyword heuristics run offline.
[inference]
type = "openai"
api_key = "${OPENAI_API_KEY}"
model = "gpt-3.5-turbo"
temperature = 0.3
timeout_secs = 30

[analysis]
# seed = 42
recent_uploads_limit = 10
"#;

const SAMPLE_GRADEBOOK: &str = r#"{
  "teachers": [
    { "id": 1, "name": "Grace Hopper" }
  ],
  "students": [
    { "id": 10, "name": "Ada Lovelace" },
    { "id": 11, "name": "Alan Turing" }
  ],
  "syllabi": [],
  "answer_sheets": [],
  "analyses": []
}
"#;
