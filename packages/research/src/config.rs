//! Runtime settings from the environment.

use std::path::PathBuf;

use crate::error::{ResearchError, Result};

/// Default chat model for synthesis.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Application settings, loaded from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub rivalry_model: String,
    pub data_dir: PathBuf,
    /// Candidates requested per paper family
    pub max_results_per_family: usize,
}

impl Settings {
    /// Load settings, reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; the environment may carry everything.
        let _ = dotenvy::dotenv();

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ResearchError::Config("OPENAI_API_KEY not set".to_string()))?;

        Ok(Self {
            openai_api_key,
            rivalry_model: std::env::var("RIVALRY_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            max_results_per_family: std::env::var("MAX_RESULTS_PER_FAMILY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::aggregator::DEFAULT_MAX_RESULTS),
        })
    }

    /// Settings that never touch the network-facing collaborators, for
    /// commands that only read local state.
    pub fn local_only() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            openai_api_key: String::new(),
            rivalry_model: DEFAULT_MODEL.to_string(),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            max_results_per_family: crate::aggregator::DEFAULT_MAX_RESULTS,
        }
    }

    /// SQLite connection URL for the source catalog.
    pub fn sources_db_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.data_dir.join("sources.db").display()
        )
    }
}
