pub mod history;
pub mod init;
pub mod play;
pub mod stock;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};

use quizkit_core::bank::QuestionBank;
use quizkit_core::cache::QuestionCache;
use quizkit_core::model::{canonical_category, DifficultyChoice, CATEGORIES};
use quizkit_core::supply::QuestionSupply;
use quizkit_core::traits::LlmProvider;
use quizkit_providers::QuizkitConfig;

/// Accept a category name in any case, returning the offered spelling.
pub fn parse_category(name: &str) -> Result<String> {
    canonical_category(name)
        .map(str::to_string)
        .with_context(|| format!("unknown category '{name}' (choose from: {})", CATEGORIES.join(", ")))
}

pub fn parse_difficulty(value: &str) -> Result<DifficultyChoice> {
    value
        .parse()
        .with_context(|| format!("invalid difficulty '{value}' (easy, medium, hard or random)"))
}

/// Wire the question supply from configuration.
pub fn build_supply(
    config: &QuizkitConfig,
    provider: Option<Arc<dyn LlmProvider>>,
) -> Result<QuestionSupply> {
    let bank = QuestionBank::load_dir(&config.bank_dir)?;
    let cache = QuestionCache::load(config.cache_path());
    Ok(QuestionSupply::new(
        provider,
        Arc::new(bank),
        cache,
        config.supply_config(),
    ))
}
