use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::DEFAULT_TIME_LIMIT_SECS;
use crate::source::DEFAULT_ENDPOINT;

const APP_NAME: &str = "quiz-exam";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Question bank URL.
    pub endpoint: String,
    /// Seconds on the clock for a fresh attempt.
    pub time_limit_secs: u32,
    /// Colour the chosen option correct/incorrect before submission.
    pub reveal_answers: bool,
    /// Extra fetch attempts after the first one fails.
    pub fetch_retries: u32,
    /// Session file; the platform data directory when unset.
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            reveal_answers: false,
            fetch_retries: 2,
            store_path: None,
        }
    }
}

impl Config {
    /// Where the session file lives.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(AppDirs::session_path)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> io::Result<()>;
}

/// Config kept as pretty JSON on disk.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
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
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };

        serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "ignoring malformed config");
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

/// Platform directory resolution.
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("quiz-exam-config.json"))
    }

    pub fn session_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.data_local_dir().join("session.json"))
            .unwrap_or_else(|| PathBuf::from("quiz-exam-session.json"))
    }

    pub fn log_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.data_local_dir().join("quiz-exam.log"))
            .unwrap_or_else(|| PathBuf::from("quiz-exam.log"))
    }
}
