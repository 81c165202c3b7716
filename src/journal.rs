//! Journal CSV source adapter.
//!
//! Converts rows of the static journal citation CSV (Title, Link, Authors,
//! Year, JournalName) into [`NormalizedRecord`]s. Adaptation is a pure
//! function of the row and its index; missing optional fields fall back to
//! placeholders and never fail the batch.

use crate::config;
use crate::error::Result;
use crate::record::{NormalizedRecord, SourceType};
use chrono::Datelike;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One raw row of the journal CSV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalRow {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Link", default)]
    pub link: String,
    #[serde(rename = "Authors", default)]
    pub authors: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "JournalName", default)]
    pub journal_name: String,
}

/// Adapt one CSV row into the unified record shape.
///
/// The id is namespaced by row index (`journal-<index>`). The publication
/// date is synthesized as January 1st of the row's year, defaulting to the
/// current year when the Year field is absent or unparseable.
pub fn adapt_row(row: &JournalRow, index: usize) -> NormalizedRecord {
    let year = row
        .year
        .trim()
        .parse::<i32>()
        .unwrap_or_else(|_| chrono::Utc::now().year());

    let title = if row.title.is_empty() {
        config::FALLBACK_TITLE.to_string()
    } else {
        row.title.clone()
    };

    let document_link = if row.link.is_empty() {
        config::FALLBACK_LINK.to_string()
    } else {
        row.link.clone()
    };

    let authors: Vec<String> = if row.authors.is_empty() {
        Vec::new()
    } else {
        row.authors
            .split(';')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    };

    let project_title = if row.journal_name.is_empty() {
        "N/A Journal".to_string()
    } else {
        row.journal_name.clone()
    };

    NormalizedRecord {
        id: format!("journal-{}", index),
        title,
        document_link,
        publication_date: format!("{}-01-01", year),
        source_type: SourceType::Journal,
        authors,
        abstract_text: config::JOURNAL_ABSTRACT_PLACEHOLDER.to_string(),
        subject_categories: vec!["General Journal".to_string()],
        mission: "N/A (Journal/Publication)".to_string(),
        project_title,
    }
}

/// Parse CSV text into normalized records.
///
/// Row indices are assigned in file order so ids stay stable for a given
/// input. A malformed row fails the whole parse; the caller treats that as a
/// load failure for this source only.
pub fn parse_csv(text: &str) -> Result<Vec<NormalizedRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<JournalRow>().enumerate() {
        records.push(adapt_row(&row?, index));
    }

    info!(count = records.len(), "Parsed journal CSV");
    Ok(records)
}

/// Load and parse a journal CSV file from disk.
pub fn load_file(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_csv(&text)
}
