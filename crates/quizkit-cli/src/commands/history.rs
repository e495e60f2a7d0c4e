//! The `quizkit history` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Utc};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use quizkit_core::history::HistoryStore;
use quizkit_core::results::WeeklyMissionProgress;
use quizkit_providers::config::load_config_from;

pub fn execute(clear: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let mut store = HistoryStore::load(config.history_path());

    if clear {
        store.clear()?;
        println!("History cleared.");
        return Ok(());
    }

    if store.is_empty() {
        println!("No quiz history yet. Run `quizkit play` to start.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Date", "Category", "Score", "Accuracy", "Level"]);
    for result in store.results() {
        table.add_row(vec![
            result.date.format("%Y-%m-%d %H:%M").to_string(),
            result.category.clone(),
            format!("{}/{}", result.score, result.total_questions),
            format!("{}%", result.percentage()),
            result.literacy_level.title().to_string(),
        ]);
    }
    println!("{table}");

    let mission =
        WeeklyMissionProgress::from_results(store.results(), Utc::now() - Duration::days(7));
    println!(
        "\nWeekly mission: {:.0}% accuracy in {} categories ({}/{} done{})",
        mission.target_accuracy * 100.0,
        mission.target_category_count,
        mission.unique_categories_at_target.len().min(mission.target_category_count),
        mission.target_category_count,
        if mission.completed() { ", complete!" } else { "" }
    );
    if !mission.unique_categories_at_target.is_empty() {
        let done: Vec<&str> = mission
            .unique_categories_at_target
            .iter()
            .map(String::as_str)
            .collect();
        println!("Categories: {}", done.join(", "));
    }

    Ok(())
}
