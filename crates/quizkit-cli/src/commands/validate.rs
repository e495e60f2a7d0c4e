//! The `quizkit validate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use quizkit_core::bank::{bank_files, parse_bank_file};
use quizkit_core::model::Difficulty;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let files = if bank_path.is_dir() {
        let mut files = bank_files(&bank_path)?;
        let single = bank_path.join("questions.json");
        if files.is_empty() && single.is_file() {
            files.push(single);
        }
        anyhow::ensure!(
            !files.is_empty(),
            "no question files found in {}",
            bank_path.display()
        );
        files
    } else {
        vec![bank_path]
    };

    let mut total = 0;
    let mut total_rejected = 0;
    let mut per_category: BTreeMap<String, [usize; 3]> = BTreeMap::new();

    for path in &files {
        let file = parse_bank_file(path)?;
        println!("{}: {} questions", path.display(), file.questions.len());
        for (index, reason) in &file.rejected {
            println!("  [#{index}] INVALID: {reason}");
        }
        for q in &file.questions {
            let counts = per_category.entry(q.category.clone()).or_default();
            counts[difficulty_slot(q.difficulty)] += 1;
        }
        total += file.questions.len();
        total_rejected += file.rejected.len();
    }

    println!();
    for (category, [easy, medium, hard]) in &per_category {
        println!("  {category}: {easy} easy, {medium} medium, {hard} hard");
    }

    if total_rejected == 0 {
        println!("All {total} questions valid.");
    } else {
        println!("\n{total} valid, {total_rejected} invalid question(s) found.");
    }

    Ok(())
}

fn difficulty_slot(difficulty: Difficulty) -> usize {
    match difficulty {
        Difficulty::Easy => 0,
        Difficulty::Medium => 1,
        Difficulty::Hard => 2,
    }
}
