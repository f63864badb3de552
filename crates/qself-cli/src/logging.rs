use anyhow::{anyhow, Result};
use std::io::{self, IsTerminal};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

// -v keeps hyper's per-connection chatter out of debug output
const DEBUG_FILTER: &str = "debug,hyper::proto::h1=warn,hyper::client::pool=warn";

/// Install the global subscriber. With a log file, output goes to a daily
/// rolling file next to it instead of stderr.
pub fn init_logging_with_file(verbose_level: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = build_filter(verbose_level, quiet, EnvFilter::try_from_default_env().ok());
    let json = json_requested(std::env::var("RUST_LOG_JSON").ok().as_deref(), io::stdout().is_terminal());
    let registry = Registry::default().with(filter);

    match log_file {
        Some(log_path) => {
            let (log_dir, log_prefix) = rolling_file_parts(log_path)?;
            std::fs::create_dir_all(log_dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, log_prefix);

            if json {
                registry
                    .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()).with_writer(appender))
                    .try_init()?;
            } else {
                registry
                    .with(
                        fmt::layer()
                            .with_timer(ChronoUtc::rfc_3339())
                            .with_ansi(false)
                            .with_writer(appender),
                    )
                    .try_init()?;
            }
        }
        None => {
            if json {
                registry
                    .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()).with_writer(io::stderr))
                    .try_init()?;
            } else {
                registry
                    .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_writer(io::stderr))
                    .try_init()?;
            }
        }
    }

    Ok(())
}

/// Quiet wins over everything. Otherwise `RUST_LOG` wins over the verbosity
/// flags.
fn build_filter(verbose_level: u8, quiet: bool, from_env: Option<EnvFilter>) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    let default = match verbose_level {
        0 => "info",
        1 => DEBUG_FILTER,
        _ => "trace",
    };
    from_env.unwrap_or_else(|| EnvFilter::new(default))
}

/// JSON when asked for explicitly, or when stdout is not a terminal (e.g.
/// under Docker or a service manager).
fn json_requested(env_value: Option<&str>, stdout_is_terminal: bool) -> bool {
    match env_value {
        Some(value) => value == "true",
        None => !stdout_is_terminal,
    }
}

/// Split `logs/qself.log` into the directory and the `qself` prefix the
/// rolling appender dates its files with.
fn rolling_file_parts(log_path: &Path) -> Result<(&Path, &str)> {
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid log file name: {}", log_path.display()))?;

    let prefix = file_name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file_name);
    Ok((log_dir, prefix))
}
