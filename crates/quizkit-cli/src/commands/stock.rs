//! The `quizkit stock` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use quizkit_core::model::Difficulty;
use quizkit_core::supply::StockReporter;
use quizkit_providers::config::load_config_from;

use super::{build_supply, parse_category, parse_difficulty};

struct ConsoleReporter;

impl StockReporter for ConsoleReporter {
    fn on_generated(&self, difficulty: Difficulty, completed: usize, total: usize) {
        eprintln!("  [{completed}/{total}] {difficulty}");
    }

    fn on_generation_error(&self, difficulty: Difficulty, error: &str) {
        eprintln!("  ERROR: {difficulty}: {error}");
    }

    fn on_stock_complete(&self, added: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {added} generated, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    category: String,
    difficulty: String,
    target: usize,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(target >= 1, "target must be at least 1");
    let category = parse_category(&category)?;
    let difficulty = parse_difficulty(&difficulty)?;

    let config = load_config_from(config_path.as_deref())?;
    let Some(provider) = config.provider()? else {
        anyhow::bail!(
            "no generation provider configured; add a [provider] table or set {}",
            quizkit_providers::config::KEY_ENV_VAR
        );
    };
    eprintln!("Stocking {category} / {difficulty} with {}...", provider.name());

    let supply = build_supply(&config, Some(provider))?;
    let added = supply
        .stock_up(&category, difficulty, target, &ConsoleReporter)
        .await?;
    println!("Added {added} question(s) to the cache.");

    let summary = supply.cache_summary().await;
    if summary.is_empty() {
        println!("The question cache is empty.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Category / Difficulty", "Queued"]);
    for (key, count) in summary {
        table.add_row(vec![key, count.to_string()]);
    }
    println!("{table}");

    Ok(())
}
