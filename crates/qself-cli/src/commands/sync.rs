use crate::output::{Output, OutputFormat};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use qself_config::{Config, CredentialStore, PathManager};
use qself_core::{KindReport, SnapshotFile, SyncOptions, SyncOrchestrator, SyncResult, DEFAULT_NOISE_THRESHOLD};
use qself_sources::{GoodreadsClient, TwitterClient};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which record kinds a command syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Goodreads,
    Twitter,
}

/// Snapshot paths given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub goodreads: Option<PathBuf>,
    pub twitter: Option<PathBuf>,
}

/// Config and credentials with environment overrides applied.
pub struct Environment {
    pub paths: PathManager,
    pub config: Config,
    pub credentials: CredentialStore,
}

impl Environment {
    pub fn load() -> Result<Self> {
        Self::load_from(PathManager::default())
    }

    pub fn load_from(paths: PathManager) -> Result<Self> {
        let config_file = paths.config_file();
        let mut config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {:#}", config_file.display(), e))?;
        config.apply_env_overrides();
        config
            .validate()
            .map_err(|e| eyre!("Configuration validation failed: {:#}", e))?;

        let credentials_file = paths.credentials_file();
        let mut credentials = CredentialStore::new(credentials_file.clone());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {:#}", credentials_file.display(), e))?;
        credentials.apply_env_overrides();

        Ok(Self {
            paths,
            config,
            credentials,
        })
    }
}

/// CLI argument first, then the configured path, then the default data file.
pub fn resolve_target(cli_path: Option<PathBuf>, configured: Option<&PathBuf>, default: PathBuf) -> PathBuf {
    cli_path.or_else(|| configured.cloned()).unwrap_or(default)
}

pub fn build_orchestrator(
    env: &Environment,
    scope: SyncScope,
    overrides: PathOverrides,
    dry_run: bool,
) -> Result<SyncOrchestrator> {
    let noise_threshold = env
        .config
        .twitter
        .as_ref()
        .and_then(|t| t.noise_threshold)
        .unwrap_or(DEFAULT_NOISE_THRESHOLD);

    let mut orchestrator = SyncOrchestrator::new(SyncOptions {
        noise_threshold,
        dry_run,
    });

    if matches!(scope, SyncScope::All | SyncScope::Goodreads) {
        match env.config.goodreads.as_ref().filter(|g| g.enabled) {
            Some(goodreads) => {
                let client = GoodreadsClient::from_config(goodreads, &env.credentials)?;
                let path = resolve_target(overrides.goodreads, goodreads.target_path.as_ref(), env.paths.readings_file());
                debug!("Goodreads snapshot: {}", path.display());
                orchestrator = orchestrator.with_readings(Box::new(client), SnapshotFile::new(path));
            }
            None if scope == SyncScope::Goodreads => {
                return Err(eyre!(
                    "Goodreads is not configured; set GOODREADS_ID or add a [goodreads] section to the config file"
                ));
            }
            None => {}
        }
    }

    if matches!(scope, SyncScope::All | SyncScope::Twitter) {
        match env.config.twitter.as_ref().filter(|t| t.enabled) {
            Some(twitter) => {
                let client = TwitterClient::from_config(twitter, &env.credentials)?;
                let path = resolve_target(overrides.twitter, twitter.target_path.as_ref(), env.paths.tweets_file());
                debug!("Twitter snapshot: {}", path.display());
                orchestrator = orchestrator.with_tweets(Box::new(client), SnapshotFile::new(path));
            }
            None if scope == SyncScope::Twitter => {
                return Err(eyre!(
                    "Twitter is not configured; set TWITTER_USER or add a [twitter] section to the config file"
                ));
            }
            None => {}
        }
    }

    if !orchestrator.has_targets() {
        return Err(eyre!(
            "Nothing to sync; configure Goodreads or Twitter (run `qself config init`)"
        ));
    }

    Ok(orchestrator)
}

pub async fn run_sync_all(
    goodreads_path: Option<PathBuf>,
    twitter_path: Option<PathBuf>,
    dry_run: bool,
    output: &Output,
) -> Result<()> {
    let env = Environment::load()?;
    let overrides = PathOverrides {
        goodreads: goodreads_path,
        twitter: twitter_path,
    };
    let orchestrator = build_orchestrator(&env, SyncScope::All, overrides, dry_run)?;

    let result = orchestrator
        .sync()
        .await
        .map_err(|e| eyre!("Sync operation failed: {:#}", e))?;

    print_result(&result, output);
    Ok(())
}

pub async fn run_sync_goodreads(path: Option<PathBuf>, dry_run: bool, output: &Output) -> Result<()> {
    let env = Environment::load()?;
    let overrides = PathOverrides {
        goodreads: path,
        ..Default::default()
    };
    let orchestrator = build_orchestrator(&env, SyncScope::Goodreads, overrides, dry_run)?;

    let report = orchestrator
        .sync_readings()
        .await
        .map_err(|e| eyre!("Goodreads sync failed: {:#}", e))?;

    print_report(&report, dry_run, output);
    Ok(())
}

pub async fn run_sync_twitter(path: Option<PathBuf>, dry_run: bool, output: &Output) -> Result<()> {
    let env = Environment::load()?;
    let overrides = PathOverrides {
        twitter: path,
        ..Default::default()
    };
    let orchestrator = build_orchestrator(&env, SyncScope::Twitter, overrides, dry_run)?;

    let report = orchestrator
        .sync_tweets()
        .await
        .map_err(|e| eyre!("Twitter sync failed: {:#}", e))?;

    print_report(&report, dry_run, output);
    Ok(())
}

fn print_result(result: &SyncResult, output: &Output) {
    match output.format() {
        OutputFormat::Human => {
            for report in result.reports() {
                print_report(report, result.dry_run, output);
            }
            output.success(format!("Sync completed in {:.1}s", result.duration.as_secs_f64()));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "success": true,
                "dry_run": result.dry_run,
                "duration_seconds": result.duration.as_secs_f64(),
                "readings": result.readings,
                "tweets": result.tweets,
            }));
        }
    }
}

fn print_report(report: &KindReport, dry_run: bool, output: &Output) {
    if output.is_json() {
        output.json(&json!({
            "success": true,
            "dry_run": dry_run,
            "report": report,
        }));
        return;
    }

    output.info(format!(
        "{}: fetched {} from {}, {} previously stored, {} total",
        report.kind, report.fetched, report.source, report.stored, report.total
    ));
    if report.duplicates > 0 {
        output.warn(format!("{}: ignored {} duplicate records from {}", report.kind, report.duplicates, report.source));
    }
    if report.missing_upstream > 0 && report.kind == "readings" {
        output.warn(format!(
            "{}: removed {} records no longer returned by {}",
            report.kind, report.missing_upstream, report.source
        ));
    }
    output.success(describe_write(report.saved, &report.path));
}

fn describe_write(saved: bool, path: &Path) -> String {
    if saved {
        format!("Wrote {}", path.display())
    } else {
        format!("Dry run; {} left unchanged", path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qself_config::{GoodreadsConfig, TwitterConfig};
    use tempfile::TempDir;

    fn environment(temp: &TempDir, config: Config) -> Environment {
        let paths = PathManager::from_base(temp.path().to_path_buf());
        let mut credentials = CredentialStore::new(paths.credentials_file());
        credentials.set_goodreads_key("key".to_string());
        credentials.set_twitter_bearer_token("token".to_string());
        Environment {
            paths,
            config,
            credentials,
        }
    }

    #[test]
    fn test_resolve_target_precedence() {
        let default = PathBuf::from("/data/readings.toml");
        let configured = PathBuf::from("/configured/readings.toml");
        let cli = PathBuf::from("/cli/readings.toml");

        assert_eq!(resolve_target(Some(cli.clone()), Some(&configured), default.clone()), cli);
        assert_eq!(resolve_target(None, Some(&configured), default.clone()), configured);
        assert_eq!(resolve_target(None, None, default.clone()), default);
    }

    #[test]
    fn test_build_orchestrator_all_uses_enabled_services() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            goodreads: Some(GoodreadsConfig::new("42".to_string())),
            ..Default::default()
        };
        let env = environment(&temp, config);

        let orchestrator = build_orchestrator(&env, SyncScope::All, PathOverrides::default(), false).unwrap();
        assert_eq!(orchestrator.enabled_kinds(), vec!["readings"]);
        assert_eq!(orchestrator.options().noise_threshold, DEFAULT_NOISE_THRESHOLD);
    }

    #[test]
    fn test_build_orchestrator_requires_requested_service() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            goodreads: Some(GoodreadsConfig::new("42".to_string())),
            ..Default::default()
        };
        let env = environment(&temp, config);

        assert!(build_orchestrator(&env, SyncScope::Twitter, PathOverrides::default(), false).is_err());
    }

    #[test]
    fn test_build_orchestrator_nothing_configured() {
        let temp = TempDir::new().unwrap();
        let env = environment(&temp, Config::default());
        assert!(build_orchestrator(&env, SyncScope::All, PathOverrides::default(), false).is_err());
    }

    #[test]
    fn test_build_orchestrator_applies_noise_threshold() {
        let temp = TempDir::new().unwrap();
        let mut twitter = TwitterConfig::new("brandur".to_string());
        twitter.noise_threshold = Some(10);
        let config = Config {
            twitter: Some(twitter),
            ..Default::default()
        };
        let env = environment(&temp, config);

        let orchestrator = build_orchestrator(&env, SyncScope::All, PathOverrides::default(), true).unwrap();
        assert_eq!(orchestrator.enabled_kinds(), vec!["tweets"]);
        assert_eq!(orchestrator.options().noise_threshold, 10);
        assert!(orchestrator.options().dry_run);
    }
}
