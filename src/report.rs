//! Result records and their console and file renderings.

use crate::aggregate::CacheTally;
use crate::settings::OutputFormat;
use crate::sites::Site;
use crate::utils::{format_instant, format_instant_short, shorten_instant, truncate};
use crate::window::TimeWindow;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;

/// Shown instead of a percentage when nothing was counted in the total.
pub const NOT_AVAILABLE: &str = "n/a";

const HOST_WIDTH: usize = 40;

/// Width of a `YYYY-MM-DD HH:MM` cell.
const INSTANT_WIDTH: usize = 16;

/// Outcome of one zone/host query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    pub zone_id: String,
    pub host: String,
    pub since_time: String,
    pub until_time: String,
    pub percent_cached: String,
    pub total_requests: u64,
    pub cached_requests: u64,
}

impl CacheReport {
    pub fn new(site: &Site, window: &TimeWindow, tally: CacheTally) -> Self {
        Self {
            zone_id: site.zone_id.clone(),
            host: site.host.clone(),
            since_time: format_instant(window.since),
            until_time: format_instant(window.until),
            percent_cached: tally
                .percent_label()
                .unwrap_or_else(|_| NOT_AVAILABLE.to_string()),
            total_requests: tally.total,
            cached_requests: tally.cached,
        }
    }

    pub fn tally(&self) -> CacheTally {
        CacheTally {
            total: self.total_requests,
            cached: self.cached_requests,
        }
    }
}

/// Print reports to stdout in the requested format.
pub fn print_reports(
    reports: &[CacheReport],
    window: &TimeWindow,
    label: &str,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reports)?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", render_table(reports, window, label)),
    }
    Ok(())
}

/// Text table with one row per report and a TOTAL row when there are several.
pub fn render_table(reports: &[CacheReport], window: &TimeWindow, label: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "📊 Cache Hit Ratio ({}: {} → {} UTC)",
        label,
        format_instant_short(window.since),
        format_instant_short(window.until)
    );

    if reports.is_empty() {
        out.push_str("No sites to report.\n");
        return out;
    }

    let total_label = format!("{} sites", reports.len());
    let zone_w = reports
        .iter()
        .map(|r| r.zone_id.chars().count())
        .max()
        .unwrap_or(0)
        .max("Zone ID".len());
    let mut host_w = reports
        .iter()
        .map(|r| r.host.chars().count().min(HOST_WIDTH))
        .max()
        .unwrap_or(0)
        .max("Host".len());
    if reports.len() > 1 {
        host_w = host_w.max(total_label.len());
    }
    let width = zone_w + host_w + 2 * INSTANT_WIDTH + 8 + 14 + 14 + 6 * 2;

    let _ = writeln!(out, "{}", "═".repeat(width));
    let _ = writeln!(
        out,
        "{:<zw$}  {:<hw$}  {:<iw$}  {:<iw$}  {:>8}  {:>14}  {:>14}",
        "Zone ID",
        "Host",
        "Since",
        "Until",
        "Cached%",
        "Total",
        "Cached",
        zw = zone_w,
        hw = host_w,
        iw = INSTANT_WIDTH
    );
    let _ = writeln!(out, "{}", "─".repeat(width));

    for report in reports {
        let _ = writeln!(
            out,
            "{:<zw$}  {:<hw$}  {:<iw$}  {:<iw$}  {}  {:>14}  {:>14}",
            report.zone_id,
            truncate(&report.host, HOST_WIDTH),
            shorten_instant(&report.since_time),
            shorten_instant(&report.until_time),
            colorize_percent(&report.percent_cached, report.tally()),
            report.total_requests,
            report.cached_requests,
            zw = zone_w,
            hw = host_w,
            iw = INSTANT_WIDTH
        );
    }

    if reports.len() > 1 {
        let total = reports
            .iter()
            .fold(CacheTally::default(), |acc, r| acc.merge(r.tally()));
        let pct = total
            .percent_label()
            .unwrap_or_else(|_| NOT_AVAILABLE.to_string());

        let _ = writeln!(out, "{}", "─".repeat(width));
        let _ = writeln!(
            out,
            "{:<zw$}  {:<hw$}  {:<iw$}  {:<iw$}  {}  {:>14}  {:>14}",
            "TOTAL",
            total_label,
            format_instant_short(window.since),
            format_instant_short(window.until),
            colorize_percent(&pct, total),
            total.total,
            total.cached,
            zw = zone_w,
            hw = host_w,
            iw = INSTANT_WIDTH
        );
    }
    out.push('\n');
    out
}

fn colorize_percent(label: &str, tally: CacheTally) -> String {
    let padded = format!("{:>8}", label);
    match tally.percent() {
        Ok(pct) if pct >= 80.0 => padded.green().to_string(),
        Ok(pct) if pct >= 50.0 => padded.yellow().to_string(),
        Ok(_) => padded.red().to_string(),
        Err(_) => padded.dimmed().to_string(),
    }
}

/// Write reports as a delimited file with a header row, replacing `path` atomically.
pub fn write_reports(reports: &[CacheReport], path: &Path, delimiter: u8) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_writer(temp_file);

    for report in reports {
        writer
            .serialize(report)
            .with_context(|| format!("Failed to write row for {}", report.host))?;
    }

    // serialize() emits the header only with the first record.
    if reports.is_empty() {
        writer.write_record([
            "zoneId",
            "host",
            "sinceTime",
            "untilTime",
            "percentCached",
            "totalRequests",
            "cachedRequests",
        ])?;
    }

    let temp_file = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", path.display(), e.error()))?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn window() -> TimeWindow {
        TimeWindow {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    fn sample() -> Vec<CacheReport> {
        vec![
            CacheReport::new(
                &Site::new("abc123", "www.example.com"),
                &window(),
                CacheTally { total: 100, cached: 80 },
            ),
            CacheReport::new(
                &Site::new("def456", "shop.example.com"),
                &window(),
                CacheTally { total: 0, cached: 0 },
            ),
        ]
    }

    fn read_back(path: &Path, delimiter: u8) -> Vec<CacheReport> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .unwrap()
            .deserialize()
            .collect::<Result<Vec<CacheReport>, _>>()
            .unwrap()
    }

    #[test]
    fn test_report_fields() {
        let reports = sample();
        assert_eq!(reports[0].percent_cached, "80.00%");
        assert_eq!(reports[0].since_time, "2024-01-01T00:00:00.000Z");
        assert_eq!(reports[0].until_time, "2024-01-02T00:00:00.000Z");
        assert_eq!(reports[1].percent_cached, NOT_AVAILABLE);
        assert_eq!(reports[1].total_requests, 0);
    }

    #[test]
    fn test_write_then_read_back() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.csv");
        let reports = sample();

        write_reports(&reports, &path, b',')?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with(
            "zoneId,host,sinceTime,untilTime,percentCached,totalRequests,cachedRequests\n"
        ));
        assert_eq!(read_back(&path, b','), reports);
        Ok(())
    }

    #[test]
    fn test_write_custom_delimiter_overwrites() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.tsv");
        std::fs::write(&path, "stale content")?;

        write_reports(&sample()[..1], &path, b'\t')?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("abc123\twww.example.com\t"));
        assert!(!content.contains("stale"));
        assert_eq!(read_back(&path, b'\t').len(), 1);
        Ok(())
    }

    #[test]
    fn test_write_empty_has_header() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.csv");
        write_reports(&[], &path, b',')?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(
            content.trim_end(),
            "zoneId,host,sinceTime,untilTime,percentCached,totalRequests,cachedRequests"
        );
        Ok(())
    }

    #[test]
    fn test_render_table_rows_and_total() {
        let table = render_table(&sample(), &window(), "last 24 hours");
        assert!(table.contains("last 24 hours: 2024-01-01 00:00 → 2024-01-02 00:00"));
        assert!(table.contains("www.example.com"));
        assert!(table.contains("80.00%"));
        assert!(table.contains(NOT_AVAILABLE));
        assert!(table.contains("TOTAL"));
        assert!(table.contains("2 sites"));
        assert!(!table.contains("NaN"));

        let row = table
            .lines()
            .find(|l| l.starts_with("abc123"))
            .unwrap();
        assert!(row.contains("www.example.com"));
        assert!(row.contains("2024-01-01 00:00  2024-01-02 00:00"));
        let header = table.lines().find(|l| l.starts_with("Zone ID")).unwrap();
        assert!(header.contains("Since"));
        assert!(header.contains("Until"));
    }

    #[test]
    fn test_render_table_short_hosts_stay_aligned() {
        let reports: Vec<CacheReport> = ["a.io", "b.io", "c.io"]
            .iter()
            .map(|host| {
                CacheReport::new(
                    &Site::new("z", *host),
                    &window(),
                    CacheTally { total: 10, cached: 5 },
                )
            })
            .collect();

        let table = render_table(&reports, &window(), "last 24 hours");
        let since_col = |prefix: &str, needle: &str| {
            let line = table.lines().find(|l| l.starts_with(prefix)).unwrap();
            line.find(needle).unwrap()
        };

        let header = since_col("Zone ID", "Since");
        assert_eq!(since_col("z ", "2024-01-01 00:00"), header);
        assert_eq!(since_col("TOTAL", "2024-01-01 00:00"), header);
        assert!(table.contains("3 sites"));
    }

    #[test]
    fn test_render_table_single_has_no_total() {
        let table = render_table(&sample()[..1], &window(), "last 24 hours");
        assert!(!table.contains("TOTAL"));
    }

    #[test]
    fn test_render_table_empty() {
        let table = render_table(&[], &window(), "custom range");
        assert!(table.contains("No sites to report."));
    }
}
