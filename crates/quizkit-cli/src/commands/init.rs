//! The `quizkit init` command.

use std::path::Path;

use anyhow::Result;

use quizkit_core::bank::sample_question;
use quizkit_providers::config::{CONFIG_FILE_NAME, STARTER_CONFIG};

const SAMPLE_BANK: &str = "questions/questions_sample.json";

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, STARTER_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all("questions")?;
    let sample_path = Path::new(SAMPLE_BANK);
    if sample_path.exists() {
        println!("{SAMPLE_BANK} already exists, skipping.");
    } else {
        let json = serde_json::to_string_pretty(&vec![sample_question()])?;
        std::fs::write(sample_path, json)?;
        println!("Created {SAMPLE_BANK}");
    }

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY (or edit {CONFIG_FILE_NAME}) to generate fresh questions");
    println!("  2. Run: quizkit validate --bank questions");
    println!("  3. Run: quizkit play --count 5");

    Ok(())
}
