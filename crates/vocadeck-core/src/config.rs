//! Settings file.
//!
//! Search order:
//! 1. an explicit path (must exist)
//! 2. `vocadeck.toml` in the current directory
//! 3. `~/.config/vocadeck/config.toml`
//!
//! Environment variable overrides: `VOCADECK_STORE`, `VOCADECK_CORPUS`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the settings file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "vocadeck.toml";

/// Quotas for assembling a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unseen cards pulled in per new day.
    #[serde(default = "default_new_cards")]
    pub new_cards: usize,
    /// Review cards pulled back in per new day.
    #[serde(default = "default_review_cards")]
    pub review_cards: usize,
    /// Display hint for the front end, `[width, height]`.
    #[serde(default = "default_window_size")]
    pub window_size: [u32; 2],
}

fn default_new_cards() -> usize {
    35
}
fn default_review_cards() -> usize {
    100
}
fn default_window_size() -> [u32; 2] {
    [80, 24]
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            new_cards: default_new_cards(),
            review_cards: default_review_cards(),
            window_size: default_window_size(),
        }
    }
}

/// Top-level vocadeck configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocadeckConfig {
    /// Card store JSON file.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Directory holding the plain-text corpus.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("flashcard_data.json")
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("flashcards")
}

impl Default for VocadeckConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            corpus_dir: default_corpus_dir(),
            session: SessionConfig::default(),
        }
    }
}

impl VocadeckConfig {
    /// Render as TOML, e.g. for writing a starter file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

/// Load configuration from the well-known locations.
pub fn load_config() -> Result<VocadeckConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VocadeckConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                global_config_path().filter(|p| p.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<VocadeckConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => VocadeckConfig::default(),
    };

    if let Ok(store) = std::env::var("VOCADECK_STORE") {
        config.store_path = PathBuf::from(store);
    }
    if let Ok(corpus) = std::env::var("VOCADECK_CORPUS") {
        config.corpus_dir = PathBuf::from(corpus);
    }

    Ok(config)
}

fn global_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|h| {
        PathBuf::from(h)
            .join(".config")
            .join("vocadeck")
            .join("config.toml")
    })
}
