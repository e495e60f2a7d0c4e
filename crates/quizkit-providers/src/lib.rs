//! quizkit-providers — Remote question generation backends.
//!
//! Implements the `LlmProvider` trait for Google Gemini, plus a scripted
//! mock, and loads `quizkit.toml` configuration.

pub mod config;
pub mod gemini;
pub mod mock;

pub use config::{create_provider, load_config, load_config_from, ProviderConfig, QuizkitConfig};
pub use gemini::GeminiProvider;
pub use mock::{MockFailure, MockProvider};
pub use quizkit_core::error::ProviderError;
