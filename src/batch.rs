//! Runs one query per site, all at once, and turns the counts into reports.

use crate::aggregate::{CacheTally, StatusSets};
use crate::cloudflare::AnalyticsSource;
use crate::report::CacheReport;
use crate::sites::Site;
use crate::window::TimeWindow;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use tracing::{info, warn};

/// Query every site concurrently. The first failure fails the whole batch;
/// on success the reports are in the same order as `sites`.
pub async fn run<S: AnalyticsSource>(
    source: &S,
    sites: &[Site],
    window: &TimeWindow,
    statuses: &StatusSets,
) -> Result<Vec<CacheReport>> {
    info!(sites = sites.len(), "querying cache statistics");

    let queries = sites
        .iter()
        .map(|site| report_for_site(source, site, window, statuses));
    try_join_all(queries).await
}

async fn report_for_site<S: AnalyticsSource>(
    source: &S,
    site: &Site,
    window: &TimeWindow,
    statuses: &StatusSets,
) -> Result<CacheReport> {
    let rows = source
        .cache_status_counts(site, window)
        .await
        .with_context(|| format!("Query failed for {} (zone {})", site.host, site.zone_id))?;

    let tally = CacheTally::from_rows(&rows, statuses);
    if let Err(e) = tally.percent() {
        warn!(zone = %site.zone_id, host = %site.host, "{}", e);
    }

    Ok(CacheReport::new(site, window, tally))
}
