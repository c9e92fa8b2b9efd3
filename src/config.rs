use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::delay::{DelayRange, DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS};
use crate::error::{ReflexError, Result};
use crate::login::{DEFAULT_CREDENTIAL_ENV, DEFAULT_LOGIN_TYPE_ENV};
use crate::ranking::{DEFAULT_ACTIVITY_ID, DEFAULT_BOARD_SIZE, DEFAULT_RANKING_URL};
use crate::session::DEFAULT_TOTAL_ROUNDS;

const MAX_ROUNDS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub total_rounds: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub submit_scores: bool,
    pub ranking_url: String,
    pub activity_id: String,
    pub ranking_size: usize,
    pub feedback_url: Option<String>,
    pub http_timeout_ms: u64,
    pub credential_env: String,
    pub login_type_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            submit_scores: true,
            ranking_url: DEFAULT_RANKING_URL.to_string(),
            activity_id: DEFAULT_ACTIVITY_ID.to_string(),
            ranking_size: DEFAULT_BOARD_SIZE,
            feedback_url: None,
            http_timeout_ms: 8000,
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            login_type_env: DEFAULT_LOGIN_TYPE_ENV.to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.total_rounds == 0 || self.total_rounds > MAX_ROUNDS {
            return Err(ReflexError::InvalidConfig(format!(
                "total_rounds must be between 1 and {MAX_ROUNDS}, got {}",
                self.total_rounds
            )));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ReflexError::InvalidConfig(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.ranking_size == 0 {
            return Err(ReflexError::InvalidConfig(
                "ranking_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delay_range(&self) -> DelayRange {
        DelayRange::new(self.min_delay_ms, self.max_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing files give the defaults; malformed files are logged and
    /// also give the defaults
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
