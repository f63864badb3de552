use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub goodreads: Option<GoodreadsConfig>,
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodreadsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub user_id: String,
    /// Snapshot file; defaults to `<data dir>/readings.toml`
    #[serde(default)]
    pub target_path: Option<PathBuf>,
    #[serde(default = "default_goodreads_base_url")]
    pub base_url: String,
    #[serde(default = "default_goodreads_per_page")]
    pub per_page: u32,
    /// Number of concurrent page workers. The Goodreads API is slow but
    /// supports offset pagination, so pages are striped across workers.
    #[serde(default = "default_goodreads_segments")]
    pub segments: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub user: String,
    /// Snapshot file; defaults to `<data dir>/tweets.toml`
    #[serde(default)]
    pub target_path: Option<PathBuf>,
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
    #[serde(default = "default_twitter_page_size")]
    pub page_size: u32,
    /// Counter drift below this is kept out of the snapshot. Unset means the
    /// engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_threshold: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl GoodreadsConfig {
    pub fn new(user_id: String) -> Self {
        Self {
            enabled: true,
            user_id,
            target_path: None,
            base_url: default_goodreads_base_url(),
            per_page: default_goodreads_per_page(),
            segments: default_goodreads_segments(),
        }
    }
}

impl TwitterConfig {
    pub fn new(user: String) -> Self {
        Self {
            enabled: true,
            user,
            target_path: None,
            base_url: default_twitter_base_url(),
            page_size: default_twitter_page_size(),
            noise_threshold: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_goodreads_base_url() -> String {
    "https://www.goodreads.com".to_string()
}

fn default_goodreads_per_page() -> u32 {
    20
}

fn default_goodreads_segments() -> u32 {
    6
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_twitter_page_size() -> u32 {
    100 // API maximum
}

fn default_schedule() -> String {
    // tokio-cron-scheduler takes a seconds field first
    "0 0 */6 * * *".to_string() // Every 6 hours
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config in {}", path.display()))?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise start from an empty
    /// config so that an environment-only setup still works.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay `GOODREADS_ID` and `TWITTER_USER` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// A variable for a section that isn't configured creates that section
    /// with defaults.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user_id) = lookup("GOODREADS_ID").filter(|v| !v.is_empty()) {
            match self.goodreads.as_mut() {
                Some(goodreads) => goodreads.user_id = user_id,
                None => self.goodreads = Some(GoodreadsConfig::new(user_id)),
            }
        }

        if let Some(user) = lookup("TWITTER_USER").filter(|v| !v.is_empty()) {
            match self.twitter.as_mut() {
                Some(twitter) => twitter.user = user,
                None => self.twitter = Some(TwitterConfig::new(user)),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(goodreads) = self.goodreads.as_ref().filter(|g| g.enabled) {
            if goodreads.user_id.trim().is_empty() {
                return Err(anyhow::anyhow!("Goodreads is enabled but user_id is not configured"));
            }
            if goodreads.per_page == 0 {
                return Err(anyhow::anyhow!("goodreads.per_page must be positive"));
            }
            if goodreads.segments == 0 {
                return Err(anyhow::anyhow!("goodreads.segments must be positive"));
            }
        }

        if let Some(twitter) = self.twitter.as_ref().filter(|t| t.enabled) {
            if twitter.user.trim().is_empty() {
                return Err(anyhow::anyhow!("Twitter is enabled but user is not configured"));
            }
            if twitter.page_size < 5 || twitter.page_size > 100 {
                return Err(anyhow::anyhow!("twitter.page_size must be between 5 and 100"));
            }
            if twitter.noise_threshold == Some(0) {
                return Err(anyhow::anyhow!("twitter.noise_threshold must be positive"));
            }
        }

        Ok(())
    }

    pub fn is_goodreads_enabled(&self) -> bool {
        self.goodreads.as_ref().map(|g| g.enabled).unwrap_or(false)
    }

    pub fn is_twitter_enabled(&self) -> bool {
        self.twitter.as_ref().map(|t| t.enabled).unwrap_or(false)
    }

    /// Get list of configured and enabled services
    pub fn get_configured_services(&self) -> Vec<String> {
        let mut services = Vec::new();
        if self.is_goodreads_enabled() {
            services.push("goodreads".to_string());
        }
        if self.is_twitter_enabled() {
            services.push("twitter".to_string());
        }
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut twitter = TwitterConfig::new("brandur".to_string());
        twitter.noise_threshold = Some(5);
        let config = Config {
            goodreads: Some(GoodreadsConfig::new("12345".to_string())),
            twitter: Some(twitter),
            scheduler: None,
        };

        config.save_to_file(file.path()).unwrap();

        let loaded = Config::load_from_file(file.path()).unwrap();
        let goodreads = loaded.goodreads.as_ref().unwrap();
        assert_eq!(goodreads.user_id, "12345");
        assert_eq!(goodreads.segments, 6);
        assert_eq!(goodreads.per_page, 20);
        assert_eq!(loaded.twitter.as_ref().unwrap().user, "brandur");
        assert_eq!(loaded.twitter.as_ref().unwrap().noise_threshold, Some(5));
    }

    #[test]
    fn test_config_defaults_from_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            [goodreads]
            user_id = "42"

            [twitter]
            user = "someone"
            "#,
        )
        .unwrap();

        let goodreads = config.goodreads.as_ref().unwrap();
        assert!(goodreads.enabled);
        assert_eq!(goodreads.base_url, "https://www.goodreads.com");
        assert!(goodreads.target_path.is_none());

        let twitter = config.twitter.as_ref().unwrap();
        assert_eq!(twitter.page_size, 100);
        assert_eq!(twitter.noise_threshold, None);
        assert!(config.validate().is_ok());
        assert_eq!(config.get_configured_services(), vec!["goodreads", "twitter"]);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert!(config.goodreads.is_none());
        assert!(config.twitter.is_none());
        assert!(config.get_configured_services().is_empty());
    }

    #[test]
    fn test_env_overrides_create_missing_sections() {
        let mut config = Config::default();
        let env: HashMap<&str, &str> = [("GOODREADS_ID", "777"), ("TWITTER_USER", "brandur")]
            .into_iter()
            .collect();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.goodreads.as_ref().unwrap().user_id, "777");
        assert_eq!(config.twitter.as_ref().unwrap().user, "brandur");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_keep_other_settings() {
        let mut goodreads = GoodreadsConfig::new("1".to_string());
        goodreads.segments = 2;
        let mut config = Config {
            goodreads: Some(goodreads),
            ..Config::default()
        };
        config.apply_overrides_from(|key| (key == "GOODREADS_ID").then(|| "2".to_string()));

        let goodreads = config.goodreads.as_ref().unwrap();
        assert_eq!(goodreads.user_id, "2");
        assert_eq!(goodreads.segments, 2);
        assert!(config.twitter.is_none());
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config {
            goodreads: Some(GoodreadsConfig::new(String::new())),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.goodreads = Some(GoodreadsConfig::new("1".to_string()));
        assert!(config.validate().is_ok());

        let mut twitter = TwitterConfig::new("someone".to_string());
        twitter.page_size = 500;
        config.twitter = Some(twitter);
        assert!(config.validate().is_err());

        let mut twitter = TwitterConfig::new("someone".to_string());
        twitter.noise_threshold = Some(0);
        config.twitter = Some(twitter);
        assert!(config.validate().is_err());

        // Disabled sections aren't validated
        let mut twitter = TwitterConfig::new(String::new());
        twitter.enabled = false;
        config.twitter = Some(twitter);
        assert!(config.validate().is_ok());
    }
}
