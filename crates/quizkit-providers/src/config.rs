//! Configuration loading and provider factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizkit_core::model::DifficultyChoice;
use quizkit_core::session::QuizSettings;
use quizkit_core::supply::SupplyConfig;
use quizkit_core::traits::LlmProvider;

use crate::gemini::GeminiProvider;

pub const CONFIG_FILE_NAME: &str = "quizkit.toml";
pub const KEY_ENV_VAR: &str = "QUIZKIT_GEMINI_KEY";
const CACHE_FILE_NAME: &str = "question-cache.json";
const HISTORY_FILE_NAME: &str = "history.json";

/// Remote generation backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

/// Top-level quizkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizkitConfig {
    /// Without a provider only bundled questions are used.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    /// Max concurrent generation requests.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Extra questions generated on every fetch to refill the cache.
    #[serde(default)]
    pub restock_margin: usize,
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default = "default_category")]
    pub default_category: String,
    /// `Easy`, `Medium`, `Hard` or `Random`.
    #[serde(default = "default_difficulty")]
    pub default_difficulty: String,
    /// Directory of bundled `questions_*.json` files.
    #[serde(default = "default_bank_dir")]
    pub bank_dir: PathBuf,
    /// Directory for the question cache and history files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_temperature() -> f64 {
    1.0
}
fn default_count() -> usize {
    5
}
fn default_category() -> String {
    quizkit_core::model::RANDOM_CATEGORY.to_string()
}
fn default_difficulty() -> String {
    "Medium".to_string()
}
fn default_bank_dir() -> PathBuf {
    PathBuf::from("./questions")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./.quizkit")
}

impl Default for QuizkitConfig {
    fn default() -> Self {
        Self {
            provider: None,
            parallelism: default_parallelism(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            temperature: default_temperature(),
            restock_margin: 0,
            default_count: default_count(),
            default_category: default_category(),
            default_difficulty: default_difficulty(),
            bank_dir: default_bank_dir(),
            data_dir: default_data_dir(),
        }
    }
}

impl QuizkitConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE_NAME)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE_NAME)
    }

    pub fn supply_config(&self) -> SupplyConfig {
        SupplyConfig {
            parallelism: self.parallelism.max(1),
            temperature: self.temperature,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            restock_margin: self.restock_margin,
            ..SupplyConfig::default()
        }
    }

    /// Setup-screen defaults.
    pub fn default_settings(&self) -> Result<QuizSettings> {
        let difficulty: DifficultyChoice = self
            .default_difficulty
            .parse()
            .with_context(|| format!("invalid default_difficulty '{}'", self.default_difficulty))?;
        Ok(QuizSettings {
            count: self.default_count,
            category: self.default_category.clone(),
            difficulty,
        })
    }

    /// Build the configured provider, if any. A provider whose key resolved
    /// to an empty string is treated as absent.
    pub fn provider(&self) -> Result<Option<Arc<dyn LlmProvider>>> {
        match &self.provider {
            Some(ProviderConfig::Gemini { api_key, .. }) if api_key.trim().is_empty() => {
                tracing::warn!("Gemini API key is empty; using bundled questions only");
                Ok(None)
            }
            Some(config) => create_provider(config).map(Some),
            None => Ok(None),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini {
            api_key,
            base_url,
            model,
        } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: model.as_ref().map(|m| resolve_env_vars(m)),
        },
    }
}

/// Set or create the Gemini key from an override value.
fn apply_key_override(config: &mut QuizkitConfig, key: Option<String>) {
    let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
        return;
    };
    match &mut config.provider {
        Some(ProviderConfig::Gemini { api_key, .. }) => *api_key = key,
        None => {
            config.provider = Some(ProviderConfig::Gemini {
                api_key: key,
                base_url: None,
                model: None,
            })
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizkit.toml` in the current directory
/// 2. `~/.config/quizkit/config.toml`
///
/// `QUIZKIT_GEMINI_KEY` overrides the configured Gemini key.
pub fn load_config() -> Result<QuizkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizkitConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config_file(path)?,
        None => QuizkitConfig::default(),
    };
    tracing::debug!(path = ?config_path, "loaded configuration");

    apply_key_override(&mut config, std::env::var(KEY_ENV_VAR).ok());
    config.provider = config.provider.as_ref().map(resolve_provider_config);

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<QuizkitConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_config_str(&content).with_context(|| format!("failed to parse config: {}", path.display()))
}

pub fn parse_config_str(content: &str) -> Result<QuizkitConfig> {
    Ok(toml::from_str::<QuizkitConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizkit"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    match config {
        ProviderConfig::Gemini {
            api_key,
            base_url,
            model,
        } => Ok(Arc::new(GeminiProvider::new(
            api_key,
            base_url.clone(),
            model.clone(),
        )?)),
    }
}

/// Starter `quizkit.toml` written by `quizkit init`.
pub const STARTER_CONFIG: &str = r#"# quizkit configuration

parallelism = 4
max_retries = 2
retry_delay_ms = 500
temperature = 1.0
restock_margin = 0

default_count = 5
default_category = "Random"
default_difficulty = "Medium"

bank_dir = "./questions"
data_dir = "./.quizkit"

# Remove this table to play with bundled questions only.
[provider]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
# model = "gemini-2.5-flash"
"#;
