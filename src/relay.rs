//! CORS proxy relay in front of the NASA OSDR REST API.
//!
//! Browsers cannot call the OSDR API directly, so this server forwards for
//! them. Two endpoints:
//!
//! - `GET /datasets?limit=&offset=` aggregates: fetch the full dataset-id
//!   list upstream, slice the requested window, then fan out one metadata
//!   request per dataset and flatten each into a [`DatasetSummary`]. A
//!   failed metadata fetch degrades that one record instead of failing the
//!   batch.
//! - `GET /dataset/{*path}` passes through to the same upstream path,
//!   forwarding query parameters and propagating the upstream status and
//!   body verbatim.
//!
//! Cross-origin access is limited to an explicit origin allow-list.
//! Requests without an Origin header (curl, server-to-server) are untouched.

use crate::config;
use crate::error::{EngineError, Result};
use crate::osdr::DatasetSummary;
use crate::record::SourceType;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared relay state: one upstream client and the upstream base URL.
pub struct RelayState {
    client: reqwest::Client,
    upstream_base: String,
}

impl RelayState {
    /// Build relay state against an upstream base URL.
    pub fn new(upstream_base: &str) -> Result<Self> {
        let upstream_base = upstream_base.trim_end_matches('/').to_string();
        url::Url::parse(&upstream_base)
            .map_err(|e| EngineError::Config(format!("Invalid upstream URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config::api::HTTP_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upstream_base,
        })
    }
}

/// Build the relay router with CORS and request tracing applied.
pub fn router(state: Arc<RelayState>) -> Router {
    let origins: Vec<HeaderValue> = config::ALLOWED_ORIGINS
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET]);

    Router::new()
        .route("/datasets", get(list_datasets))
        .route("/dataset/{*path}", get(proxy_dataset))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and run the relay server.
pub async fn serve(host: &str, port: u16, upstream_base: &str) -> Result<()> {
    let state = Arc::new(RelayState::new(upstream_base)?);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| EngineError::Config(format!("Invalid host:port: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, upstream = upstream_base, "Relay listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// `GET /datasets?limit=&offset=`
async fn list_datasets(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(config::PAGE_SIZE);
    let offset = params
        .get("offset")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    match aggregate_datasets(&state, limit, offset).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err((status, details)) => {
            warn!(status = status.as_u16(), details = %details, "Dataset aggregation failed");
            (
                status,
                Json(json!({
                    "error": "Failed to aggregate datasets and metadata from external API.",
                    "details": details,
                })),
            )
                .into_response()
        }
    }
}

/// Fetch the id list, slice the window, fan out metadata requests.
async fn aggregate_datasets(
    state: &RelayState,
    limit: usize,
    offset: usize,
) -> std::result::Result<Vec<DatasetSummary>, (StatusCode, String)> {
    let list_url = format!("{}/datasets", state.upstream_base);
    debug!(url = %list_url, "Fetching dataset id list");

    let response = state
        .client
        .get(&list_url)
        .send()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let code =
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((code, format!("Upstream dataset list error: {}", status)));
    }

    let listing: Value = response
        .json()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Upstream shape: a map of accession -> {REST_URL, ...}. Insertion order
    // is preserved, so a (limit, offset) window is stable across calls.
    let entries: Vec<(String, Option<String>)> = listing
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(id, details)| {
                    let rest_url = details
                        .get("REST_URL")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    (id.clone(), rest_url)
                })
                .collect()
        })
        .unwrap_or_default();

    let window: Vec<(String, Option<String>)> =
        entries.into_iter().skip(offset).take(limit).collect();

    info!(count = window.len(), offset = offset, "Fetching metadata for dataset window");

    let fetches = window
        .iter()
        .map(|(id, rest_url)| fetch_summary(state, id, rest_url.as_deref()));
    Ok(join_all(fetches).await)
}

/// Fetch and flatten one dataset's metadata; degrade on failure.
async fn fetch_summary(
    state: &RelayState,
    id: &str,
    rest_url: Option<&str>,
) -> DatasetSummary {
    let url = format!("{}/dataset/{}/metadata/", state.upstream_base, id);

    let result = async {
        let response = state.client.get(&url).send().await?;
        response.error_for_status()?.json::<Value>().await
    }
    .await;

    match result {
        Ok(document) => summary_from_metadata(id, rest_url, &document),
        Err(e) => {
            warn!(id = id, error = %e, "Metadata fetch failed, degrading record");
            degraded_summary(id, rest_url)
        }
    }
}

/// Flatten one metadata document into the wire summary shape.
///
/// Field fallbacks, in order: title from `"study publication title"`, then
/// `"study title"`, then a constructed placeholder; link from
/// `"project link"`, then the listing's REST URL, then `"#<id>"`.
fn summary_from_metadata(id: &str, rest_url: Option<&str>, document: &Value) -> DatasetSummary {
    let metadata = &document[id]["metadata"];

    let title = field_str(metadata, "study publication title")
        .or_else(|| field_str(metadata, "study title"))
        .unwrap_or_else(|| format!("OSDR Study: {}", id));

    let document_link = field_str(metadata, "project link")
        .or_else(|| rest_url.filter(|u| !u.is_empty()).map(str::to_string))
        .unwrap_or_else(|| format!("#{}", id));

    let publication_date = metadata
        .get("study_public_release_date")
        .and_then(epoch_value_to_date);

    DatasetSummary {
        id: id.to_string(),
        title,
        document_link,
        publication_date,
        source_type: SourceType::Osdr,
    }
}

/// Placeholder summary for a dataset whose metadata could not be fetched.
fn degraded_summary(id: &str, rest_url: Option<&str>) -> DatasetSummary {
    DatasetSummary {
        id: id.to_string(),
        title: format!("OSDR Study: {} (Metadata Fetch Failed)", id),
        document_link: rest_url
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", id)),
        publication_date: None,
        source_type: SourceType::Osdr,
    }
}

/// Non-empty string field accessor.
fn field_str(metadata: &Value, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Release timestamps arrive as epoch seconds, numeric or stringified.
fn epoch_value_to_date(value: &Value) -> Option<String> {
    let secs = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    crate::osdr::epoch_to_date(secs as i64)
}

/// `GET /dataset/{*path}` - transparent pass-through.
async fn proxy_dataset(
    State(state): State<Arc<RelayState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let mut url = format!("{}/dataset/{}", state.upstream_base, path);
    if let Some(query) = query {
        url.push('?');
        url.push_str(&query);
    }

    info!(url = %url, "Forwarding dataset request");

    let response = match state.client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => return proxy_failure(&url, &e.to_string()),
    };

    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match response.bytes().await {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => proxy_failure(&url, &e.to_string()),
    }
}

fn proxy_failure(url: &str, details: &str) -> Response {
    warn!(url = %url, details = %details, "Proxy request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Proxy request failed",
            "details": details,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_field_fallbacks() {
        let document = json!({
            "OSD-1": {
                "metadata": {
                    "study publication title": "Published Title",
                    "study title": "Plain Title",
                    "project link": "http://project",
                    "study_public_release_date": 1580515200
                }
            }
        });
        let summary = summary_from_metadata("OSD-1", Some("http://rest"), &document);
        assert_eq!(summary.title, "Published Title");
        assert_eq!(summary.document_link, "http://project");
        assert_eq!(summary.publication_date.as_deref(), Some("2020-02-01"));
    }

    #[test]
    fn test_summary_title_fallback_chain() {
        let document = json!({"OSD-2": {"metadata": {"study title": "Plain Title"}}});
        let summary = summary_from_metadata("OSD-2", None, &document);
        assert_eq!(summary.title, "Plain Title");

        let empty = json!({"OSD-2": {"metadata": {}}});
        let summary = summary_from_metadata("OSD-2", None, &empty);
        assert_eq!(summary.title, "OSDR Study: OSD-2");
        assert_eq!(summary.document_link, "#OSD-2");
        assert_eq!(summary.publication_date, None);
    }

    #[test]
    fn test_summary_link_prefers_rest_url_over_placeholder() {
        let document = json!({"OSD-3": {"metadata": {}}});
        let summary = summary_from_metadata("OSD-3", Some("http://rest/OSD-3"), &document);
        assert_eq!(summary.document_link, "http://rest/OSD-3");
    }

    #[test]
    fn test_degraded_summary() {
        let summary = degraded_summary("OSD-4", Some("http://rest/OSD-4"));
        assert_eq!(summary.title, "OSDR Study: OSD-4 (Metadata Fetch Failed)");
        assert_eq!(summary.document_link, "http://rest/OSD-4");
        assert_eq!(summary.publication_date, None);
    }

    #[test]
    fn test_epoch_value_accepts_number_or_string() {
        assert_eq!(
            epoch_value_to_date(&json!(1580515200)).as_deref(),
            Some("2020-02-01")
        );
        assert_eq!(
            epoch_value_to_date(&json!("1580515200")).as_deref(),
            Some("2020-02-01")
        );
        assert_eq!(epoch_value_to_date(&json!(null)), None);
        assert_eq!(epoch_value_to_date(&json!("soon")), None);
    }
}
