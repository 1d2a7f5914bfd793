//! Time window resolution: named presets ending now, or an explicit since/until pair.

use crate::error::ConfigError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use std::fmt;

/// Named look-back windows accepted by `--time-window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowPreset {
    #[value(name = "30 minutes", alias = "30m")]
    ThirtyMinutes,
    #[value(name = "6 hours", alias = "6h")]
    SixHours,
    #[value(name = "12 hours", alias = "12h")]
    TwelveHours,
    #[value(name = "24 hours", alias = "24h")]
    TwentyFourHours,
    #[value(name = "48 hours", alias = "48h")]
    FortyEightHours,
    #[value(name = "7 days", alias = "7d")]
    SevenDays,
    #[value(name = "14 days", alias = "14d")]
    FourteenDays,
    #[value(name = "21 days", alias = "21d")]
    TwentyOneDays,
    #[value(name = "30 days", alias = "30d")]
    ThirtyDays,
}

pub const DEFAULT_WINDOW: WindowPreset = WindowPreset::TwentyFourHours;

impl WindowPreset {
    pub fn label(self) -> &'static str {
        match self {
            WindowPreset::ThirtyMinutes => "30 minutes",
            WindowPreset::SixHours => "6 hours",
            WindowPreset::TwelveHours => "12 hours",
            WindowPreset::TwentyFourHours => "24 hours",
            WindowPreset::FortyEightHours => "48 hours",
            WindowPreset::SevenDays => "7 days",
            WindowPreset::FourteenDays => "14 days",
            WindowPreset::TwentyOneDays => "21 days",
            WindowPreset::ThirtyDays => "30 days",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            WindowPreset::ThirtyMinutes => Duration::minutes(30),
            WindowPreset::SixHours => Duration::hours(6),
            WindowPreset::TwelveHours => Duration::hours(12),
            WindowPreset::TwentyFourHours => Duration::hours(24),
            WindowPreset::FortyEightHours => Duration::hours(48),
            WindowPreset::SevenDays => Duration::days(7),
            WindowPreset::FourteenDays => Duration::days(14),
            WindowPreset::TwentyOneDays => Duration::days(21),
            WindowPreset::ThirtyDays => Duration::days(30),
        }
    }

    /// Parse a preset name or alias (case-insensitive), as found in the config file.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        <WindowPreset as ValueEnum>::from_str(name.trim(), true)
            .map_err(|_| ConfigError::UnknownWindow(name.to_string()))
    }
}

impl fmt::Display for WindowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the user asked for the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    Preset(WindowPreset),
    Explicit {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

/// Concrete start/end instants for every query in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolve a spec against `now`. Presets end at `now`.
    pub fn resolve(spec: &WindowSpec, now: DateTime<Utc>) -> Self {
        match spec {
            WindowSpec::Preset(preset) => TimeWindow {
                since: now - preset.duration(),
                until: now,
            },
            WindowSpec::Explicit { since, until } => TimeWindow {
                since: *since,
                until: *until,
            },
        }
    }
}

impl WindowSpec {
    /// Build an explicit window, rejecting unparseable or unordered bounds.
    pub fn explicit(since: &str, until: &str) -> Result<Self, ConfigError> {
        let since_at = parse_instant("since", since)?;
        let until_at = parse_instant("until", until)?;
        if since_at >= until_at {
            return Err(ConfigError::WindowOrder {
                since: since.to_string(),
                until: until.to_string(),
            });
        }
        Ok(WindowSpec::Explicit {
            since: since_at,
            until: until_at,
        })
    }

    pub fn describe(&self) -> String {
        match self {
            WindowSpec::Preset(preset) => format!("last {}", preset),
            WindowSpec::Explicit { .. } => "custom range".to_string(),
        }
    }
}

/// Parse RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (UTC) or a bare date (midnight UTC).
pub fn parse_instant(flag: &'static str, value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(ConfigError::InvalidInstant {
        flag,
        value: value.to_string(),
    })
}
