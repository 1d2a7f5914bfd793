//! Site list input: a CSV file with `zoneId` and `host` columns.

use crate::error::ConfigError;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One zone/host pair to query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Site {
    #[serde(rename = "zoneId")]
    pub zone_id: String,
    pub host: String,
}

impl Site {
    pub fn new(zone_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            host: host.into(),
        }
    }
}

/// Read every site from `path`. Extra columns are ignored.
pub fn read_sites(path: &Path) -> Result<Vec<Site>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|e| ConfigError::SiteList {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    parse_sites(file, path)
}

fn parse_sites<R: Read>(reader: R, path: &Path) -> Result<Vec<Site>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut sites = Vec::new();
    for (idx, row) in reader.deserialize::<Site>().enumerate() {
        let site = row.map_err(|e| ConfigError::SiteList {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;

        let row_number = idx + 1;
        if site.zone_id.is_empty() {
            return Err(ConfigError::EmptySiteField {
                path: path.to_path_buf(),
                row: row_number,
                field: "zoneId",
            });
        }
        if site.host.is_empty() {
            return Err(ConfigError::EmptySiteField {
                path: path.to_path_buf(),
                row: row_number,
                field: "host",
            });
        }
        sites.push(site);
    }

    Ok(sites)
}
