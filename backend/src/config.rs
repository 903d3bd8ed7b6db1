use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Serialize, Deserialize};

use crate::get_create_catalog_db_path;
use crate::logger::warn;

/// Settings shared by extraction, persistence and search.
///
/// Values come from `CatalogConfig::default()`, then an optional JSON file
/// named by `SHELFMARK_CONFIG`, then individual `SHELFMARK_*` environment
/// variables. A `.env` file in the working directory is loaded first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the served site. Title directories live under `{web_root}/ebooks/`.
    pub web_root: PathBuf,
    /// Directory of bare repositories, named `{author}_{title}.git`.
    pub repos_root: PathBuf,
    pub identifier_prefix: String,
    pub github_org: String,
    pub words_per_minute: u32,
    pub max_string_length: usize,
    pub max_long_string_length: usize,
    pub max_language_length: usize,
    pub history_count: usize,
    pub history_timeout_secs: u64,
    pub page_size: i64,
    pub database_url: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            web_root: PathBuf::from("/standardebooks.org/web/www"),
            repos_root: PathBuf::from("/standardebooks.org/ebooks"),
            identifier_prefix: "url:https://standardebooks.org/ebooks/".to_string(),
            github_org: "standardebooks".to_string(),
            words_per_minute: 275,
            max_string_length: 255,
            max_long_string_length: 500,
            max_language_length: 10,
            history_count: 5,
            history_timeout_secs: 10,
            page_size: 12,
            database_url: None,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse::<T>() {
        Ok(x) => Some(x),
        Err(_) => {
            warn(&format!("Ignoring invalid value for {}: {}", key, value));
            None
        }
    }
}

impl CatalogConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let mut config = match env::var("SHELFMARK_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(Path::new(&path))?,
            _ => CatalogConfig::default(),
        };

        config.apply_env();
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CatalogConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(s) = env::var("SHELFMARK_WEB_ROOT") {
            self.web_root = PathBuf::from(s);
        }
        if let Ok(s) = env::var("SHELFMARK_REPOS_ROOT") {
            self.repos_root = PathBuf::from(s);
        }
        if let Ok(s) = env::var("SHELFMARK_IDENTIFIER_PREFIX") {
            self.identifier_prefix = s;
        }
        if let Ok(s) = env::var("SHELFMARK_GITHUB_ORG") {
            self.github_org = s;
        }
        if let Some(x) = env_parse("SHELFMARK_WORDS_PER_MINUTE") {
            self.words_per_minute = x;
        }
        if let Some(x) = env_parse("SHELFMARK_HISTORY_COUNT") {
            self.history_count = x;
        }
        if let Some(x) = env_parse("SHELFMARK_HISTORY_TIMEOUT_SECS") {
            self.history_timeout_secs = x;
        }
        if let Some(x) = env_parse("SHELFMARK_PAGE_SIZE") {
            self.page_size = x;
        }
        if let Ok(s) = env::var("SHELFMARK_DATABASE_URL") {
            if !s.trim().is_empty() {
                self.database_url = Some(s);
            }
        }
    }

    /// Where title serving directories live, e.g. `{web_root}/ebooks/`.
    pub fn ebooks_dist_path(&self) -> PathBuf {
        self.web_root.join("ebooks")
    }

    pub fn covers_path(&self) -> PathBuf {
        self.web_root.join("images").join("covers")
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs)
    }

    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => get_create_catalog_db_path().to_string_lossy().to_string(),
        }
    }
}
