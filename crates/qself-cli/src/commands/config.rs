use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use owo_colors::OwoColorize;
use qself_config::{Config, CredentialStore, PathManager};
use serde_json::json;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# qself configuration
#
# Secrets live in credentials.toml next to this file; set them with
# `qself config credentials` or the GOODREADS_KEY / TWITTER_BEARER_TOKEN
# environment variables.

[goodreads]
enabled = true
user_id = ""
# target_path = "/path/to/readings.toml"
# per_page = 20
# segments = 6

[twitter]
enabled = true
user = ""
# target_path = "/path/to/tweets.toml"
# page_size = 100
# noise_threshold = 3

[scheduler]
schedule = "0 0 */6 * * *"
run_on_startup = true
"#;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    match cmd {
        ConfigCommands::Show { full } => show_config(&paths, full, output),
        ConfigCommands::Init { force } => init_config(&paths, force, output),
        ConfigCommands::Credentials {
            goodreads_key,
            twitter_bearer_token,
        } => set_credentials(&paths, goodreads_key, twitter_bearer_token, output),
    }
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    let mut config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {:#}", config_file.display(), e))?;
    config.apply_env_overrides();

    let mut credentials = CredentialStore::new(paths.credentials_file());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {:#}", e))?;
    credentials.apply_env_overrides();

    let secret = |value: Option<&String>| match value {
        Some(v) if full => v.clone(),
        Some(v) => mask_string(v),
        None => "<not set>".to_string(),
    };

    match output.format() {
        OutputFormat::Human => {
            println!("{} {}", "Config file:".bold(), describe_file(&config_file));
            println!("{} {}", "Data directory:".bold(), paths.data_dir().display());
            println!();

            match &config.goodreads {
                Some(goodreads) => {
                    println!("{}", "[goodreads]".bright_cyan().bold());
                    println!("  enabled     {}", enabled_marker(goodreads.enabled));
                    println!("  user_id     {}", goodreads.user_id);
                    println!(
                        "  target      {}",
                        goodreads
                            .target_path
                            .clone()
                            .unwrap_or_else(|| paths.readings_file())
                            .display()
                    );
                    println!("  per_page    {}", goodreads.per_page);
                    println!("  segments    {}", goodreads.segments);
                    println!("  key         {}", secret(credentials.get_goodreads_key()));
                }
                None => println!("{} {}", "[goodreads]".bright_cyan().bold(), "not configured".dimmed()),
            }
            println!();

            match &config.twitter {
                Some(twitter) => {
                    println!("{}", "[twitter]".bright_cyan().bold());
                    println!("  enabled     {}", enabled_marker(twitter.enabled));
                    println!("  user        {}", twitter.user);
                    println!(
                        "  target      {}",
                        twitter
                            .target_path
                            .clone()
                            .unwrap_or_else(|| paths.tweets_file())
                            .display()
                    );
                    println!("  page_size   {}", twitter.page_size);
                    println!(
                        "  threshold   {}",
                        twitter
                            .noise_threshold
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "default".to_string())
                    );
                    println!("  token       {}", secret(credentials.get_twitter_bearer_token()));
                }
                None => println!("{} {}", "[twitter]".bright_cyan().bold(), "not configured".dimmed()),
            }
            println!();

            if let Some(scheduler) = &config.scheduler {
                println!("{}", "[scheduler]".bright_cyan().bold());
                println!("  schedule    {}", scheduler.schedule);
                println!("  on startup  {}", enabled_marker(scheduler.run_on_startup));
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file,
                "config": config,
                "credentials": {
                    "goodreads_key": secret(credentials.get_goodreads_key()),
                    "twitter_bearer_token": secret(credentials.get_twitter_bearer_token()),
                },
            }));
        }
    }

    Ok(())
}

fn init_config(paths: &PathManager, force: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        output.warn(format!(
            "Config file already exists at {} (use --force to overwrite)",
            config_file.display()
        ));
        return Ok(());
    }

    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create directories: {:#}", e))?;
    std::fs::write(&config_file, CONFIG_TEMPLATE)?;

    output.success(format!("Wrote {}", config_file.display()));
    output.info("Fill in user_id and user, then run `qself config credentials`.");
    Ok(())
}

fn set_credentials(
    paths: &PathManager,
    goodreads_key: Option<String>,
    twitter_bearer_token: Option<String>,
    output: &Output,
) -> Result<()> {
    if goodreads_key.is_none() && twitter_bearer_token.is_none() {
        return Err(eyre!(
            "Nothing to store; pass --goodreads-key and/or --twitter-bearer-token"
        ));
    }

    let credentials_file = paths.credentials_file();
    let mut credentials = CredentialStore::new(credentials_file.clone());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {:#}", e))?;

    if let Some(key) = goodreads_key {
        credentials.set_goodreads_key(key);
    }
    if let Some(token) = twitter_bearer_token {
        credentials.set_twitter_bearer_token(token);
    }

    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {:#}", credentials_file.display(), e))?;

    output.success(format!("Credentials saved to {}", credentials_file.display()));
    Ok(())
}

fn describe_file(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

fn enabled_marker(enabled: bool) -> String {
    if enabled {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
