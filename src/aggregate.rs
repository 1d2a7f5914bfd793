//! Cache ratio aggregation over per-status request counts.
//!
//! Rows whose status is in the include set count as cached. Rows whose status
//! is not in the exclude set count toward the total. A label listed in both
//! sets is treated as included: it is dropped from the exclude set when the
//! sets are built, so cached can never exceed total.

use crate::error::AggregateError;
use std::collections::BTreeSet;
use tracing::warn;

/// Statuses counted as cached when no override is given.
pub const DEFAULT_INCLUDE_STATUSES: &[&str] = &["hit", "none"];

/// Statuses dropped from the total when no override is given.
pub const DEFAULT_EXCLUDE_STATUSES: &[&str] = &[];

/// One row from the analytics source: a cache status and its request count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

impl StatusCount {
    pub fn new(status: impl Into<String>, count: u64) -> Self {
        Self {
            status: status.into(),
            count,
        }
    }
}

/// Normalized include/exclude status sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSets {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl StatusSets {
    /// Build the sets. Labels are trimmed and lowercased; empty labels are ignored.
    /// Overlapping labels stay included and are logged.
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let include = normalize(include);
        let mut exclude = normalize(exclude);

        let overlap: Vec<String> = include.intersection(&exclude).cloned().collect();
        for label in overlap {
            warn!(
                status = %label,
                "cache status is both included and excluded; counting it as included"
            );
            exclude.remove(&label);
        }

        Self { include, exclude }
    }

    pub fn include(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(String::as_str)
    }

    pub fn exclude(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(String::as_str)
    }

    fn is_cached(&self, status: &str) -> bool {
        self.include.contains(&status.to_lowercase())
    }

    fn is_counted(&self, status: &str) -> bool {
        !self.exclude.contains(&status.to_lowercase())
    }
}

impl Default for StatusSets {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUDE_STATUSES, DEFAULT_EXCLUDE_STATUSES)
    }
}

fn normalize<I, S>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Summed counts for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheTally {
    pub total: u64,
    pub cached: u64,
}

impl CacheTally {
    /// Partition `rows` into cached and total according to `statuses`.
    pub fn from_rows(rows: &[StatusCount], statuses: &StatusSets) -> Self {
        rows.iter().fold(CacheTally::default(), |mut acc, row| {
            if statuses.is_cached(&row.status) {
                acc.cached = acc.cached.saturating_add(row.count);
            }
            if statuses.is_counted(&row.status) {
                acc.total = acc.total.saturating_add(row.count);
            }
            acc
        })
    }

    /// Combine tallies, e.g. for a TOTAL row across sites.
    pub fn merge(self, other: CacheTally) -> CacheTally {
        CacheTally {
            total: self.total.saturating_add(other.total),
            cached: self.cached.saturating_add(other.cached),
        }
    }

    /// Cached share of total, in percent.
    pub fn percent(&self) -> Result<f64, AggregateError> {
        if self.total == 0 {
            return Err(AggregateError::NoCountedRequests);
        }
        Ok(self.cached as f64 / self.total as f64 * 100.0)
    }

    /// Percentage with two decimals and a `%` suffix, e.g. `80.00%`.
    ///
    /// Exact ties round up (1 of 32 is `3.13%`), so this works in integer
    /// basis points instead of going through `{:.2}`.
    pub fn percent_label(&self) -> Result<String, AggregateError> {
        if self.total == 0 {
            return Err(AggregateError::NoCountedRequests);
        }
        let total = self.total as u128;
        let basis_points = (self.cached as u128 * 20_000 + total) / (2 * total);
        Ok(format!("{}.{:02}%", basis_points / 100, basis_points % 100))
    }
}
