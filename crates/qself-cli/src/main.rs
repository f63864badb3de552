use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{config, daemon, sync};
use qself_config::PathManager;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "qself")]
#[command(about = "qself - Keep local snapshots of your Goodreads readings and tweets")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync Goodreads readings and tweets concurrently
    #[command(long_about = "Fetch every configured service and merge the results into their snapshot files. Both services run to completion; the command fails if either of them failed.")]
    SyncAll {
        /// Readings snapshot file (overrides goodreads.target_path)
        #[arg(long, value_name = "PATH")]
        goodreads_path: Option<PathBuf>,

        /// Tweets snapshot file (overrides twitter.target_path)
        #[arg(long, value_name = "PATH")]
        twitter_path: Option<PathBuf>,

        /// Fetch and merge without writing snapshot files
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Sync Goodreads readings
    SyncGoodreads {
        /// Readings snapshot file (overrides goodreads.target_path)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Fetch and merge without writing the snapshot file
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Sync tweets
    SyncTwitter {
        /// Tweets snapshot file (overrides twitter.target_path)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Fetch and merge without writing the snapshot file
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run as a daemon with an internal scheduler
    #[command(long_about = "Run sync-all periodically according to the configured cron schedule until interrupted. An initial sync runs on startup unless --no-startup-sync is given. Failed runs are logged and do not stop the daemon.")]
    Daemon {
        /// Cron schedule with a leading seconds field (e.g. '0 0 */6 * * *')
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the initial sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,

        /// Write logs to a daily rolling file instead of stderr (defaults to
        /// logs/qself.log under the config directory)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        log_file: Option<Option<PathBuf>>,
    },
    /// Inspect or create configuration and credentials
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (masks secrets)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a template config file
    Init {
        /// Overwrite an existing config file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store API credentials in credentials.toml
    Credentials {
        /// Goodreads developer key
        #[arg(long)]
        goodreads_key: Option<String>,

        /// Twitter API v2 bearer token
        #[arg(long)]
        twitter_bearer_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // A missing .env is fine
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Daemon {
            log_file: Some(path), ..
        } => Some(path.clone().unwrap_or_else(|| PathManager::default().daemon_log_file())),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file.as_deref())
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let output = output::Output::new(cli.output, cli.quiet);

    let result = match cli.command {
        Commands::SyncAll {
            goodreads_path,
            twitter_path,
            dry_run,
        } => sync::run_sync_all(goodreads_path, twitter_path, dry_run, &output).await,
        Commands::SyncGoodreads { path, dry_run } => sync::run_sync_goodreads(path, dry_run, &output).await,
        Commands::SyncTwitter { path, dry_run } => sync::run_sync_twitter(path, dry_run, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_sync,
            ..
        } => daemon::run_daemon(schedule, no_startup_sync, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "Command failed");
        // JSON consumers get the failure on stdout; color-eyre reports it on stderr
        if output.is_json() {
            output.error(format!("{:#}", e));
        }
    }
    result
}
