use crate::aggregate::{DEFAULT_EXCLUDE_STATUSES, DEFAULT_INCLUDE_STATUSES};
use crate::cloudflare::DEFAULT_ENDPOINT;
use crate::window::DEFAULT_WINDOW;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub statuses: StatusConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE_STATUSES.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE_STATUSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub time_window: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            time_window: DEFAULT_WINDOW.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub colors: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { colors: true }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path())
    }

    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Write the config to `path`, replacing any existing file atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let content = toml::to_string_pretty(self)?;
        let mut temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        temp_file.write_all(content.as_bytes())?;
        temp_file
            .persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn create_default() -> Result<PathBuf> {
        let path = get_config_path();
        Config::default().save_to(&path)?;
        Ok(path)
    }

    /// `section.key = value` for every setting that differs from the default.
    pub fn overrides(&self) -> Result<Vec<String>> {
        let current = toml::Value::try_from(self)?;
        let defaults = toml::Value::try_from(Config::default())?;

        let mut changed = Vec::new();
        let Some(sections) = current.as_table() else {
            return Ok(changed);
        };
        for (section, values) in sections {
            let Some(values) = values.as_table() else {
                continue;
            };
            for (key, value) in values {
                let default = defaults.get(section).and_then(|s| s.get(key));
                if default != Some(value) {
                    changed.push(format!("{}.{} = {}", section, key, value));
                }
            }
        }
        Ok(changed)
    }
}

fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("percent-cached").join("config.toml")
}

pub fn show_config() -> Result<()> {
    let path = get_config_path();
    let config = Config::load_from(&path)?;

    println!("Config: {}", path.display());
    if !path.exists() {
        println!("(file not created, showing defaults)");
    }
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    let overrides = config.overrides()?;
    if overrides.is_empty() {
        println!("All values are defaults.");
    } else {
        println!("Changed from defaults:");
        for line in overrides {
            println!("  * {}", line);
        }
    }

    Ok(())
}
