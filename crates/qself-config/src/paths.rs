use anyhow::Result;
use std::path::{Path, PathBuf};

/// Base path from `QSELF_BASE_PATH`, if set. Used for containers and tests.
pub fn base_path_override() -> Option<PathBuf> {
    std::env::var("QSELF_BASE_PATH").ok().map(PathBuf::from)
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("qself");

        Ok(Self::from_base(base_dir))
    }

    /// Config files at the base level, data and logs in subdirectories.
    pub fn from_base(base: PathBuf) -> Self {
        Self {
            config_dir: base.clone(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    /// Default location of the readings snapshot when none is configured
    pub fn readings_file(&self) -> PathBuf {
        self.data_dir.join("readings.toml")
    }

    /// Default location of the tweets snapshot when none is configured
    pub fn tweets_file(&self) -> PathBuf {
        self.data_dir.join("tweets.toml")
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.log_dir.join("qself.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        if let Some(base) = base_path_override() {
            return Self::from_base(base);
        }

        // Platform-specific paths otherwise (e.g., ~/.config/qself on Linux)
        Self::new().unwrap_or_else(|_| Self::from_base(PathBuf::from(".qself")))
    }
}
