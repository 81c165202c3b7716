//! NASA OSDR source adapter and relay client.
//!
//! Two raw shapes arrive from this source. A full study summary (local
//! `osd.json` snapshot, `results` array) carries nested identity, mission,
//! and publication data. A dataset summary (the relay's `/datasets`
//! endpoint) is already flattened to the unified field names. Both are
//! adapted into [`NormalizedRecord`]s here.
//!
//! Adaptation never fails on missing optional fields. The accession code is
//! the one required identity field; a summary without it is dropped from the
//! batch, the batch itself survives.

use crate::config;
use crate::error::{EngineError, Result};
use crate::record::{NormalizedRecord, SourceType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw OSDR study summary, as found in the snapshot's `results` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudySummary {
    #[serde(default)]
    pub id: Option<StudyId>,
    #[serde(default)]
    pub study_title: Option<String>,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateValue>,
    #[serde(default)]
    pub mission: Option<Mission>,
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub publication: Option<Vec<Publication>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyId {
    #[serde(default)]
    pub accession: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mission {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Publication {
    /// Upstream key literally contains a space.
    #[serde(rename = "author list", default)]
    pub author_list: Vec<Option<String>>,
}

/// A date field that arrives either as epoch seconds or as ISO text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Epoch(f64),
    Text(String),
}

impl DateValue {
    /// Resolve to a calendar date (`YYYY-MM-DD`), if representable.
    pub fn to_iso_date(&self) -> Option<String> {
        match self {
            Self::Epoch(secs) => epoch_to_date(*secs as i64),
            Self::Text(text) => {
                let date_part = text.split('T').next().unwrap_or_default();
                chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.format("%Y-%m-%d").to_string())
            }
        }
    }
}

/// Convert epoch seconds to an ISO calendar date (UTC).
pub(crate) fn epoch_to_date(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Adapt one study summary into the unified record shape.
///
/// Returns `None` when the summary has no accession code, which drops that
/// single record from the batch.
pub fn adapt_summary(summary: &StudySummary) -> Option<NormalizedRecord> {
    let accession = summary
        .id
        .as_ref()
        .and_then(|id| id.accession.as_deref())
        .filter(|a| !a.is_empty())?
        .to_string();

    let title = summary
        .study_title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("OSDR Study: {}", accession));

    let document_link = summary
        .rest_url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("{}/{}", config::api::OSDR_STUDY_REPO_URL, accession));

    let publication_date = summary
        .start_date
        .as_ref()
        .and_then(DateValue::to_iso_date)
        .unwrap_or_else(|| config::FALLBACK_OSDR_DATE.to_string());

    let mission = summary
        .mission
        .as_ref()
        .and_then(|m| m.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown Mission".to_string());

    let authors: Vec<String> = summary
        .publication
        .iter()
        .flatten()
        .flat_map(|p| p.author_list.iter())
        .flatten()
        .filter(|a| !a.is_empty())
        .cloned()
        .collect();

    let subject_categories: Vec<String> = ["Space Biology"]
        .into_iter()
        .map(str::to_string)
        .chain(summary.organism.clone())
        .filter(|c| !c.is_empty())
        .collect();

    Some(NormalizedRecord {
        id: accession,
        title: title.clone(),
        document_link,
        publication_date,
        source_type: SourceType::Osdr,
        authors,
        abstract_text: summary.study_title.clone().unwrap_or_else(|| title.clone()),
        subject_categories,
        mission,
        project_title: summary.project_title.clone().unwrap_or(title),
    })
}

/// Adapt a batch of study summaries, dropping records without an accession.
pub fn adapt_batch(summaries: &[StudySummary]) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> = summaries.iter().filter_map(adapt_summary).collect();
    let dropped = summaries.len() - records.len();
    if dropped > 0 {
        warn!(dropped = dropped, "Dropped OSDR summaries without accession");
    }
    records
}

/// Local OSDR snapshot file shape.
#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub results: Vec<StudySummary>,
}

/// Parse snapshot JSON text into normalized records.
pub fn parse_snapshot(text: &str) -> Result<Vec<NormalizedRecord>> {
    let snapshot: Snapshot = serde_json::from_str(text)?;
    let records = adapt_batch(&snapshot.results);
    info!(count = records.len(), "Parsed OSDR snapshot");
    Ok(records)
}

/// Load and parse an OSDR snapshot file from disk.
pub fn load_snapshot(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_snapshot(&text)
}

/// Flattened dataset summary on the relay's `/datasets` wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "documentLink")]
    pub document_link: String,
    #[serde(rename = "publicationDate", skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(rename = "sourceType")]
    pub source_type: SourceType,
}

impl From<DatasetSummary> for NormalizedRecord {
    fn from(summary: DatasetSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title.clone(),
            document_link: summary.document_link,
            publication_date: summary
                .publication_date
                .unwrap_or_else(|| config::FALLBACK_OSDR_DATE.to_string()),
            source_type: summary.source_type,
            authors: Vec::new(),
            abstract_text: summary.title.clone(),
            subject_categories: vec!["Space Biology".to_string()],
            mission: "Unknown Mission".to_string(),
            project_title: summary.title,
        }
    }
}

/// HTTP client for the proxy relay's OSDR endpoints.
pub struct OsdrClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsdrClient {
    /// Create a client pointed at a relay base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config::api::HTTP_TIMEOUT)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one page of dataset summaries and adapt them.
    ///
    /// `offset` is the number of OSDR records already resident; the relay
    /// slices the upstream id list accordingly.
    pub async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let url = format!("{}/datasets", self.base_url);
        debug!(url = %url, offset = offset, limit = limit, "Fetching OSDR page");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                code: i32::from(status.as_u16()),
                message: format!("Relay /datasets error: {} - {}", status, body),
            });
        }

        let summaries: Vec<DatasetSummary> = response.json().await?;
        info!(count = summaries.len(), offset = offset, "Fetched OSDR page");
        Ok(summaries.into_iter().map(NormalizedRecord::from).collect())
    }

    /// Fetch the raw metadata document for one study.
    pub async fn fetch_metadata(&self, accession: &str) -> Result<serde_json::Value> {
        self.get_json(&format!("{}/dataset/{}/metadata/", self.base_url, accession))
            .await
    }

    /// Fetch the raw file listing for one study.
    pub async fn fetch_files(&self, accession: &str) -> Result<serde_json::Value> {
        self.get_json(&format!("{}/dataset/{}/files", self.base_url, accession))
            .await
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!(url = %url, "Relay GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                code: i32::from(status.as_u16()),
                message: format!("Relay error: {} - {}", status, body),
            });
        }
        Ok(response.json().await?)
    }
}
