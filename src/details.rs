//! Single-study details: metadata and file listing.
//!
//! Fetches one study's raw metadata document and file listing through the
//! relay, concurrently, and shapes them for display. Both requests must
//! succeed; unlike the list aggregation there is no degraded fallback for a
//! details view.

use crate::error::Result;
use crate::osdr::OsdrClient;
use serde_json::Value;

/// Keys surfaced prominently, excluded from the extra-parameter listing.
const PROMINENT_KEYS: &[&str] = &[
    "study publication title",
    "study publication author list",
    "study description",
    "name",
];

/// One associated file of a study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyFile {
    pub file_name: String,
    pub url: String,
    pub rest_url: String,
    /// Filename extension, uppercased for display.
    pub file_type: String,
}

/// Shaped details for one study.
#[derive(Debug, Clone)]
pub struct StudyDetails {
    pub accession: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    /// Scalar metadata entries beyond the prominent fields, in document order.
    pub parameters: Vec<(String, String)>,
    pub files: Vec<StudyFile>,
}

/// Fetch and shape one study's details through the relay.
pub async fn fetch_details(client: &OsdrClient, accession: &str) -> Result<StudyDetails> {
    let (metadata, files) = tokio::try_join!(
        client.fetch_metadata(accession),
        client.fetch_files(accession),
    )?;
    Ok(shape_details(accession, &metadata, &files))
}

/// Shape raw metadata and files documents into [`StudyDetails`].
pub fn shape_details(accession: &str, metadata_doc: &Value, files_doc: &Value) -> StudyDetails {
    // The metadata document nests under the accession; tolerate a flat
    // document as well.
    let nested = &metadata_doc[accession]["metadata"];
    let metadata = if nested.is_object() {
        nested
    } else {
        metadata_doc
    };

    let title = metadata
        .get("study publication title")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Dataset: {}", accession));

    let authors = match metadata.get("study publication author list") {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };

    let description = metadata
        .get("study description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "No study description provided.".to_string());

    let parameters = metadata
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !PROMINENT_KEYS.contains(&key.as_str()))
                .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    StudyDetails {
        accession: accession.to_string(),
        title,
        authors,
        description,
        parameters,
        files: shape_files(accession, files_doc),
    }
}

/// Scalar metadata values only; nested objects and arrays are not listed.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reshape the files map (`{<name>: {URL, REST_URL}}`) into a list.
fn shape_files(accession: &str, files_doc: &Value) -> Vec<StudyFile> {
    files_doc[accession]["files"]
        .as_object()
        .map(|files| {
            files
                .iter()
                .map(|(file_name, details)| StudyFile {
                    file_name: file_name.clone(),
                    url: details
                        .get("URL")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    rest_url: details
                        .get("REST_URL")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    file_type: file_name
                        .rsplit('.')
                        .next()
                        .unwrap_or("FILE")
                        .to_uppercase(),
                })
                .collect()
        })
        .unwrap_or_default()
}
