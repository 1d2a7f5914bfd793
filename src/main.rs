mod aggregate;
mod batch;
mod cloudflare;
mod config;
mod error;
mod report;
mod settings;
mod sites;
mod utils;
mod window;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use cloudflare::CloudflareClient;
use settings::{RunArgs, Settings, Target};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use window::TimeWindow;

#[derive(Parser)]
#[command(
    name = "percent-cached",
    version,
    about = "Cache hit ratio per host from Cloudflare analytics",
    long_about = "Queries the Cloudflare GraphQL analytics API for request counts grouped by cache status and reports the share served from cache, for one zone/host or a CSV list of sites.",
    disable_help_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or create configuration file
    Config {
        /// Create default config file
        #[arg(long)]
        create: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("percent_cached={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// A missing .env is fine; anything else (bad syntax, unreadable file) is reported.
fn dotenv_problem(result: &dotenvy::Result<PathBuf>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded before parsing so the token env var can come from .env.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Some(problem) = dotenv_problem(&dotenv) {
        warn!("ignoring .env: {}", problem);
    }

    match cli.command {
        Some(Commands::Config { create }) => {
            if create {
                let path = config::Config::create_default()?;
                println!("Created: {}", path.display());
            } else {
                config::show_config()?;
            }
            Ok(())
        }
        None => run(cli.run).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = config::Config::load()?;
    if !config.display.colors {
        colored::control::set_override(false);
    }

    let settings = Settings::resolve(args, &config)?;

    let sites = match &settings.target {
        Target::Single(site) => vec![site.clone()],
        Target::File(path) => {
            let sites = sites::read_sites(path)?;
            info!(count = sites.len(), path = %path.display(), "loaded site list");
            if sites.is_empty() {
                warn!(path = %path.display(), "site list is empty");
            }
            sites
        }
    };

    let window = TimeWindow::resolve(&settings.window, Utc::now());
    info!(
        include = ?settings.statuses.include().collect::<Vec<_>>(),
        exclude = ?settings.statuses.exclude().collect::<Vec<_>>(),
        since = %utils::format_instant(window.since),
        until = %utils::format_instant(window.until),
        "resolved query parameters"
    );
    let client = CloudflareClient::new(&settings.token, &settings.api)?;

    let reports = batch::run(&client, &sites, &window, &settings.statuses).await?;

    report::print_reports(
        &reports,
        &window,
        &settings.window.describe(),
        settings.format,
    )?;

    if let Some(path) = &settings.output_file {
        report::write_reports(&reports, path, settings.delimiter)
            .with_context(|| format!("Failed to save results to {}", path.display()))?;
        println!("Results saved to {}", path.display());
    }

    Ok(())
}
