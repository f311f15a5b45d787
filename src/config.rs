use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const CACHE_DIR: &str = "footy_terminal";
const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// Keys and knobs read from the environment once at startup. `.env.local`
/// and `.env` are layered in by `main` before this is built.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub football_key: String,
    pub openai_key: Option<String>,
    pub openai_model: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let football_key = std::env::var("FOOTBALL_API_KEY")
            .context("FOOTBALL_API_KEY is not set (put it in .env)")?;
        let openai_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let openai_model = std::env::var("OPENAI_MODEL")
            .ok()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let timeout_secs = std::env::var("FOOTBALL_API_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(1);
        Ok(Self {
            football_key,
            openai_key,
            openai_model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("mapping.sqlite"))
}
