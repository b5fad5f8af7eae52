use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod migrate;

/// Below this the watcher would pick up files still being written.
pub const MIN_QUIESCENCE_MS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: String,
    /// Folder the camera software drops photos into.
    pub watch_dir: String,
    /// Root of the activity attachments tree (`activities/YYYY/MM/DD/...`).
    pub uploads_dir: String,
    pub bind: String,
    /// Base used to build attachment URLs returned by the API.
    pub public_base_url: String,
    /// Max length of the serialized attachment list of a record.
    pub attachment_limit: usize,
    pub quiescence_ms: u64,
    pub poll_interval_ms: u64,
    /// Use the polling backend instead of native notifications
    /// (network shares, some containers).
    pub use_polling: bool,
    pub reattach_interval_ms: u64,
    /// Regexes matched against the file name; matches are never ingested.
    pub ignore_patterns: Vec<String>,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_parallel_keys: usize,
    /// Ingest files already present in `watch_dir` at startup.
    pub process_backlog: bool,
}

impl Default for Config {
    fn default() -> Self {
        let dir = Self::config_dir();
        Self {
            database: dir.join("rphotopunch.sqlite").to_string_lossy().to_string(),
            watch_dir: dir.join("photos").to_string_lossy().to_string(),
            uploads_dir: dir.join("uploads").to_string_lossy().to_string(),
            bind: "127.0.0.1:4002".to_string(),
            public_base_url: "http://localhost:4002".to_string(),
            attachment_limit: 500,
            quiescence_ms: 2000,
            poll_interval_ms: 100,
            use_polling: false,
            reattach_interval_ms: 5000,
            ignore_patterns: vec![r"DumpStack\.log\.tmp".to_string()],
            max_retries: 3,
            retry_backoff_ms: 200,
            max_parallel_keys: 8,
            process_backlog: true,
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        let base = if cfg!(target_os = "windows") {
            dirs::config_dir()
        } else {
            dirs::home_dir()
        };
        let name = if cfg!(target_os = "windows") {
            "rphotopunch"
        } else {
            ".rphotopunch"
        };
        base.unwrap_or_else(|| PathBuf::from(".")).join(name)
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rphotopunch.conf")
    }

    /// Load the default config file, or defaults if it does not exist.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    /// Load `path`; missing keys take their default value.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let cfg = if path.exists() {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            Config::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.quiescence_ms < MIN_QUIESCENCE_MS {
            return Err(AppError::Config(format!(
                "quiescence_ms must be at least {MIN_QUIESCENCE_MS} (got {})",
                self.quiescence_ms
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.attachment_limit == 0 {
            return Err(AppError::Config("attachment_limit must be > 0".into()));
        }
        if self.max_parallel_keys == 0 {
            return Err(AppError::Config("max_parallel_keys must be > 0".into()));
        }
        for p in &self.ignore_patterns {
            regex::Regex::new(p)
                .map_err(|e| AppError::Config(format!("invalid ignore pattern '{p}': {e}")))?;
        }
        Ok(())
    }

    /// Write `self` to `path`, creating parent folders.
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Create config file (unless `is_test`), the database, and the watched
    /// and uploads folders.
    pub fn init_all(&self, config_path: &Path, is_test: bool) -> AppResult<Vec<PathBuf>> {
        let mut created = Vec::new();

        if !is_test {
            self.save_to(config_path)?;
            created.push(config_path.to_path_buf());
        }

        for dir in [&self.watch_dir, &self.uploads_dir] {
            let p = expand_tilde(dir);
            if !p.exists() {
                fs::create_dir_all(&p)?;
                created.push(p);
            }
        }

        let db_path = expand_tilde(&self.database);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        created.push(db_path);

        Ok(created)
    }
}
