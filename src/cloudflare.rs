//! Cloudflare GraphQL analytics client.
//!
//! Issues one `httpRequestsAdaptiveGroups` query per zone/host/window and
//! returns request counts grouped by cache status. No retry, no pagination:
//! results are capped at [`ROW_LIMIT`] groups.

use crate::aggregate::StatusCount;
use crate::config::ApiConfig;
use crate::error::QueryError;
use crate::sites::Site;
use crate::utils::{format_instant, truncate};
use crate::window::TimeWindow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.cloudflare.com/client/v4/graphql";

/// Maximum groups returned per query.
pub const ROW_LIMIT: usize = 10_000;

/// How much of a non-GraphQL error body is kept in [`QueryError::Http`].
const BODY_PREVIEW_LEN: usize = 200;

const CACHE_STATUS_QUERY: &str = r#"
query GetCachePerHost(
    $zoneTag: string
    $host: string
    $sinceTime: Time
    $untilTime: Time
) {
    viewer {
        zones(filter: { zoneTag: $zoneTag }) {
            httpRequestsAdaptiveGroups(
                limit: 10000
                filter: {
                    AND: [
                        { datetime_geq: $sinceTime, datetime_leq: $untilTime }
                        { requestSource: "eyeball" }
                        { clientRequestHTTPHost: $host }
                    ]
                }
            ) {
                dimensions {
                    cacheStatus
                }
                count
            }
        }
    }
}
"#;

/// Anything that can return per-cache-status counts for a site and window.
#[async_trait]
pub trait AnalyticsSource: Sync {
    async fn cache_status_counts(
        &self,
        site: &Site,
        window: &TimeWindow,
    ) -> Result<Vec<StatusCount>, QueryError>;
}

/// HTTP client bound to one API token and endpoint.
pub struct CloudflareClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl CloudflareClient {
    pub fn new(token: &str, api: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: api.url.clone(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl AnalyticsSource for CloudflareClient {
    async fn cache_status_counts(
        &self,
        site: &Site,
        window: &TimeWindow,
    ) -> Result<Vec<StatusCount>, QueryError> {
        let request = build_request(site, window);
        debug!(zone = %site.zone_id, host = %site.host, "querying cache status counts");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let rows = interpret_response(status, &body)?;

        debug!(
            zone = %site.zone_id,
            host = %site.host,
            groups = rows.len(),
            "received cache status counts"
        );
        if at_row_limit(&rows) {
            warn!(
                zone = %site.zone_id,
                host = %site.host,
                "result hit the {} group limit; counts may be incomplete",
                ROW_LIMIT
            );
        }

        Ok(rows)
    }
}

// ── Request/response shapes ──

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'static str,
    variables: QueryVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryVariables<'a> {
    zone_tag: &'a str,
    host: &'a str,
    since_time: String,
    until_time: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    #[serde(default)]
    zones: Vec<Zone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Zone {
    #[serde(default)]
    http_requests_adaptive_groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct Group {
    dimensions: Dimensions,
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dimensions {
    cache_status: String,
}

fn build_request<'a>(site: &'a Site, window: &TimeWindow) -> GraphqlRequest<'a> {
    GraphqlRequest {
        query: CACHE_STATUS_QUERY,
        variables: QueryVariables {
            zone_tag: &site.zone_id,
            host: &site.host,
            since_time: format_instant(window.since),
            until_time: format_instant(window.until),
        },
    }
}

/// Decide what a response means from its status and body.
///
/// A GraphQL body wins over the status code, so a 401 carrying `errors`
/// surfaces the API's message. Only a body that is not GraphQL falls back to
/// the HTTP status.
fn interpret_response(status: StatusCode, body: &str) -> Result<Vec<StatusCount>, QueryError> {
    match parse_response(body) {
        Err(QueryError::Decode(_)) if !status.is_success() => Err(QueryError::Http {
            status: status.as_u16(),
            body: truncate(body.trim(), BODY_PREVIEW_LEN),
        }),
        other => other,
    }
}

/// A full page means groups past the limit were dropped.
fn at_row_limit(rows: &[StatusCount]) -> bool {
    rows.len() >= ROW_LIMIT
}

fn parse_response(body: &str) -> Result<Vec<StatusCount>, QueryError> {
    let response: GraphqlResponse = serde_json::from_str(body)?;

    if let Some(first) = response.errors.as_ref().and_then(|errs| errs.first()) {
        return Err(QueryError::Api(first.message.clone()));
    }

    let data = response.data.ok_or(QueryError::MissingData)?;
    let zone = data
        .viewer
        .zones
        .into_iter()
        .next()
        .ok_or(QueryError::ZoneNotFound)?;

    Ok(zone
        .http_requests_adaptive_groups
        .into_iter()
        .map(|g| StatusCount::new(g.dimensions.cache_status, g.count))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_response_groups() {
        let body = r#"{
            "data": {
                "viewer": {
                    "zones": [{
                        "httpRequestsAdaptiveGroups": [
                            {"dimensions": {"cacheStatus": "hit"}, "count": 80},
                            {"dimensions": {"cacheStatus": "miss"}, "count": 15},
                            {"dimensions": {"cacheStatus": "none"}, "count": 5}
                        ]
                    }]
                }
            },
            "errors": null
        }"#;

        let rows = parse_response(body).unwrap();
        assert_eq!(
            rows,
            vec![
                StatusCount::new("hit", 80),
                StatusCount::new("miss", 15),
                StatusCount::new("none", 5),
            ]
        );
    }

    #[test]
    fn test_parse_response_first_error_message() {
        let body = r#"{
            "data": null,
            "errors": [
                {"message": "zone 'abc' does not have access to the path", "path": ["viewer"]},
                {"message": "second"}
            ]
        }"#;

        match parse_response(body) {
            Err(QueryError::Api(msg)) => {
                assert_eq!(msg, "zone 'abc' does not have access to the path")
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_empty_error_list_is_success() {
        let body = r#"{"data":{"viewer":{"zones":[{"httpRequestsAdaptiveGroups":[]}]}},"errors":[]}"#;
        assert!(parse_response(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_response_no_zone() {
        let body = r#"{"data":{"viewer":{"zones":[]}}}"#;
        assert!(matches!(parse_response(body), Err(QueryError::ZoneNotFound)));
    }

    #[test]
    fn test_parse_response_no_data() {
        assert!(matches!(
            parse_response(r#"{"data": null}"#),
            Err(QueryError::MissingData)
        ));
    }

    #[test]
    fn test_parse_response_not_json() {
        assert!(matches!(
            parse_response("<html>502 Bad Gateway</html>"),
            Err(QueryError::Decode(_))
        ));
    }

    #[test]
    fn test_request_variables() {
        let site = Site::new("abc123", "www.example.com");
        let window = TimeWindow {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(build_request(&site, &window)).unwrap();
        assert_eq!(value["variables"]["zoneTag"], "abc123");
        assert_eq!(value["variables"]["host"], "www.example.com");
        assert_eq!(value["variables"]["sinceTime"], "2024-01-01T00:00:00.000Z");
        assert_eq!(value["variables"]["untilTime"], "2024-01-02T00:00:00.000Z");
        assert!(value["query"]
            .as_str()
            .unwrap()
            .contains("httpRequestsAdaptiveGroups"));
    }

    #[test]
    fn test_query_limit_matches_row_limit() {
        assert!(CACHE_STATUS_QUERY.contains(&format!("limit: {}", ROW_LIMIT)));
    }

    #[test]
    fn test_interpret_bad_gateway_html() {
        let body = "\n<html><body>502 Bad Gateway</body></html>\n";
        match interpret_response(StatusCode::BAD_GATEWAY, body) {
            Err(QueryError::Http { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "<html><body>502 Bad Gateway</body></html>");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_unauthorized_graphql_errors() {
        let body = r#"{"data":null,"errors":[{"message":"Authentication error"}]}"#;
        match interpret_response(StatusCode::UNAUTHORIZED, body) {
            Err(QueryError::Api(msg)) => assert_eq!(msg, "Authentication error"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_long_body_truncated() {
        let body = "x".repeat(1000);
        match interpret_response(StatusCode::SERVICE_UNAVAILABLE, &body) {
            Err(QueryError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), BODY_PREVIEW_LEN);
                assert!(body.ends_with("..."));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_success_not_json_is_decode_error() {
        assert!(matches!(
            interpret_response(StatusCode::OK, "not json"),
            Err(QueryError::Decode(_))
        ));
    }

    #[test]
    fn test_row_limit_detection() {
        let full: Vec<StatusCount> = (0..ROW_LIMIT).map(|_| StatusCount::new("hit", 1)).collect();
        assert!(at_row_limit(&full));
        assert!(!at_row_limit(&full[1..]));
        assert!(!at_row_limit(&[]));
    }
}
