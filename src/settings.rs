//! Command-line arguments for a report run, merged with the config file and
//! validated into [`Settings`] before any network call.

use crate::aggregate::StatusSets;
use crate::config::{ApiConfig, Config};
use crate::error::ConfigError;
use crate::sites::Site;
use crate::window::{WindowPreset, WindowSpec};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Cloudflare API token
    #[arg(
        short = 'a',
        long = "api-token",
        env = "CLOUDFLARE_API_TOKEN",
        hide_env_values = true
    )]
    pub api_token: Option<String>,

    /// Cloudflare Zone ID
    #[arg(short = 'z', long = "zone-id")]
    pub zone_id: Option<String>,

    /// Host to check
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Path to CSV file containing sites (zoneId,host columns)
    #[arg(short = 'f', long = "file-path")]
    pub file_path: Option<PathBuf>,

    /// Time window for statistics [default: 24 hours]
    #[arg(short = 't', long = "time-window", value_enum, conflicts_with_all = ["since", "until"])]
    pub time_window: Option<WindowPreset>,

    /// Start date in ISO format (e.g., 2024-01-01T00:00:00Z)
    #[arg(short = 's', long, requires = "until")]
    pub since: Option<String>,

    /// End date in ISO format (e.g., 2024-01-31T23:59:59Z)
    #[arg(short = 'u', long, requires = "since")]
    pub until: Option<String>,

    /// Save results to CSV file
    #[arg(short = 'o', long = "output-file")]
    pub output_file: Option<PathBuf>,

    /// Cache statuses counted as cached (comma-separated) [default: hit,none]
    #[arg(short = 'i', long = "include-statuses", value_delimiter = ',')]
    pub include_statuses: Option<Vec<String>>,

    /// Cache statuses excluded from total requests (comma-separated)
    #[arg(short = 'e', long = "exclude-statuses", value_delimiter = ',')]
    pub exclude_statuses: Option<Vec<String>>,

    /// Field delimiter for the output file
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// What to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Single(Site),
    File(PathBuf),
}

/// Validated, immutable description of one run.
#[derive(Debug)]
pub struct Settings {
    pub token: String,
    pub target: Target,
    pub window: WindowSpec,
    pub statuses: StatusSets,
    pub output_file: Option<PathBuf>,
    pub delimiter: u8,
    pub format: OutputFormat,
    pub api: ApiConfig,
}

impl Settings {
    pub fn resolve(args: RunArgs, config: &Config) -> Result<Self, ConfigError> {
        let token = non_empty(args.api_token).ok_or(ConfigError::MissingToken)?;

        let zone_id = non_empty(args.zone_id);
        let host = non_empty(args.host);
        let target = match (args.file_path, zone_id, host) {
            (Some(path), zone, host) => {
                if zone.is_some() || host.is_some() {
                    debug!("file path given; ignoring -z/-h");
                }
                Target::File(path)
            }
            (None, Some(zone), Some(host)) => Target::Single(Site::new(zone, host)),
            _ => return Err(ConfigError::MissingTarget),
        };

        let window = match (args.time_window, args.since, args.until) {
            (_, Some(since), Some(until)) => WindowSpec::explicit(&since, &until)?,
            (_, Some(_), None) | (_, None, Some(_)) => return Err(ConfigError::IncompleteWindow),
            (Some(preset), None, None) => WindowSpec::Preset(preset),
            (None, None, None) => WindowSpec::Preset(WindowPreset::parse(
                &config.defaults.time_window,
            )?),
        };

        let include = args
            .include_statuses
            .unwrap_or_else(|| config.statuses.include.clone());
        let exclude = args
            .exclude_statuses
            .unwrap_or_else(|| config.statuses.exclude.clone());
        let statuses = StatusSets::new(&include, &exclude);

        if !is_usable_delimiter(args.delimiter) {
            return Err(ConfigError::InvalidDelimiter(args.delimiter));
        }

        Ok(Settings {
            token,
            target,
            window,
            statuses,
            output_file: args.output_file,
            delimiter: args.delimiter as u8,
            format: args.format,
            api: config.api.clone(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A single ASCII byte that is neither the quote nor a line terminator,
/// so the written file can be read back.
fn is_usable_delimiter(c: char) -> bool {
    c.is_ascii() && !matches!(c, '"' | '\n' | '\r')
}
