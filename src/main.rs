//! ShareASale Reports CLI - view affiliate reports from the terminal
//!
//! Fetches traffic, activity and payment reports from the ShareASale API,
//! caching each response on disk to stay within the monthly call quota.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shareasale::api::{ApiResponse, ReportClient, RequestArgs};
use shareasale::cache::CacheManager;
use shareasale::cli::{token_count_args, CacheCommand, Cli, Command, OutputArgs, SettingsCommand};
use shareasale::config::{default_config_path, ConfigError, Settings, StoredSettings};
use shareasale::report::render_tree;

/// Installs the stderr log subscriber; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "shareasale=warn",
        1 => "shareasale=info",
        _ => "shareasale=debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Fetches one report and prints it
async fn run_report(settings: &Settings, args: &RequestArgs, output: &OutputArgs) -> Result<(), Box<dyn Error>> {
    let mut settings = settings.clone();
    if output.no_cache {
        settings.caching = false;
    }
    if !settings.has_credentials() {
        warn!("credentials are incomplete; run `shareasale settings set` first");
    }

    let client = ReportClient::from_settings(&settings)?;
    let tree = client.fetch(args).await?;
    print_tree(&tree, output)
}

fn print_tree(tree: &ApiResponse, output: &OutputArgs) -> Result<(), Box<dyn Error>> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(tree)?);
    } else {
        println!("{}", render_tree(tree, output.render_options()));
    }
    Ok(())
}

fn run_settings(config_path: &Path, action: &SettingsCommand) -> Result<(), Box<dyn Error>> {
    match action {
        SettingsCommand::Show => {
            let settings = Settings::load(config_path, &StoredSettings::default())?;
            println!("settings_file: {}", config_path.display());
            println!("{}", settings);
        }
        SettingsCommand::Set(args) => {
            if args.is_empty() {
                return Err("nothing to set; pass at least one setting flag".into());
            }
            let stored = StoredSettings::load(config_path)?.merged(&args.to_stored());
            stored.save(config_path)?;
            info!(path = %config_path.display(), "settings saved");
            println!("Settings saved to {}", config_path.display());
        }
    }
    Ok(())
}

fn run_cache(settings: &Settings, action: &CacheCommand) -> Result<(), Box<dyn Error>> {
    match action {
        CacheCommand::Clear => {
            let dir = settings
                .resolved_cache_dir()
                .ok_or("could not determine the cache directory")?;
            let cache = CacheManager::with_dir(dir, settings.cache_time);
            let removed = cache.clear()?;
            println!("Removed {} cached report(s) from {}", removed, cache.cache_dir().display());
        }
    }
    Ok(())
}

async fn run(cli: Cli, config_path: PathBuf) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Report(args) => {
            let settings = Settings::load(&config_path, &StoredSettings::default())?;
            run_report(&settings, &args.to_request_args(), &args.output).await
        }
        Command::TokenCount(output) => {
            let settings = Settings::load(&config_path, &StoredSettings::default())?;
            run_report(&settings, &token_count_args(), output).await
        }
        Command::Settings { action } => run_settings(&config_path, action),
        Command::Cache { action } => {
            let settings = Settings::load(&config_path, &StoredSettings::default())?;
            run_cache(&settings, action)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .or_else(default_config_path)
        .ok_or(ConfigError::NoConfigDir)?;

    if let Err(e) = run(cli, config_path).await {
        error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
