//! Unified record schema shared by every data source.
//!
//! All source adapters produce [`NormalizedRecord`], so the filter engine and
//! the reveal controller never care which source a record came from. Field
//! names on the wire match the original dashboard payloads (`documentLink`,
//! `publicationDate`, `sourceType`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// Journal citation from the static CSV.
    Journal,
    /// NASA OSDR study/dataset.
    #[serde(rename = "OSDR")]
    Osdr,
    /// Tolerated on input only; matches no source filter except "all".
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Journal => write!(f, "Journal"),
            Self::Osdr => write!(f, "OSDR"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Source selector for the filter engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    /// Every source passes.
    #[default]
    All,
    Journal,
    Osdr,
}

impl SourceFilter {
    /// Whether a record of the given source type passes this selector.
    /// Comparison is case-insensitive by construction; an `Unknown` source
    /// type matches neither named selector.
    pub fn matches(self, source_type: SourceType) -> bool {
        match self {
            Self::All => true,
            Self::Journal => source_type == SourceType::Journal,
            Self::Osdr => source_type == SourceType::Osdr,
        }
    }
}

impl std::str::FromStr for SourceFilter {
    type Err = crate::error::EngineError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "journal" => Ok(Self::Journal),
            "osdr" => Ok(Self::Osdr),
            other => Err(crate::error::EngineError::Parse(format!(
                "Unknown source filter: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Journal => write!(f, "journal"),
            Self::Osdr => write!(f, "osdr"),
        }
    }
}

/// The unified entity every adapter must produce.
///
/// `id` is unique across the merged collection (namespaced per source), and
/// `title`/`document_link` are always populated so consumers can use them
/// without null checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "documentLink")]
    pub document_link: String,
    /// ISO date (`YYYY-MM-DD`) or empty when the source has none.
    #[serde(rename = "publicationDate", default)]
    pub publication_date: String,
    #[serde(rename = "sourceType")]
    pub source_type: SourceType,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(rename = "subjectCategories", default)]
    pub subject_categories: Vec<String>,
    /// OSDR provenance, display-only.
    #[serde(default)]
    pub mission: String,
    /// OSDR provenance, display-only.
    #[serde(default)]
    pub project_title: String,
}

impl NormalizedRecord {
    /// Publication year parsed from the leading `YYYY` of the date, if any.
    pub fn publication_year(&self) -> Option<i32> {
        self.publication_date.get(..4).and_then(|y| y.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_filter_matching() {
        assert!(SourceFilter::All.matches(SourceType::Journal));
        assert!(SourceFilter::All.matches(SourceType::Osdr));
        assert!(SourceFilter::All.matches(SourceType::Unknown));
        assert!(SourceFilter::Journal.matches(SourceType::Journal));
        assert!(!SourceFilter::Journal.matches(SourceType::Osdr));
        assert!(!SourceFilter::Osdr.matches(SourceType::Unknown));
    }

    #[test]
    fn test_source_filter_parse() {
        assert_eq!("OSDR".parse::<SourceFilter>().ok(), Some(SourceFilter::Osdr));
        assert_eq!("All".parse::<SourceFilter>().ok(), Some(SourceFilter::All));
        assert!("library".parse::<SourceFilter>().is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let record = NormalizedRecord {
            id: "OSD-1".to_string(),
            title: "Title".to_string(),
            document_link: "http://example.com".to_string(),
            publication_date: "2020-01-01".to_string(),
            source_type: SourceType::Osdr,
            authors: vec![],
            abstract_text: String::new(),
            subject_categories: vec!["Space Biology".to_string()],
            mission: String::new(),
            project_title: String::new(),
        };

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["sourceType"], "OSDR");
        assert_eq!(json["documentLink"], "http://example.com");
        assert_eq!(json["publicationDate"], "2020-01-01");
        assert_eq!(json["subjectCategories"][0], "Space Biology");
    }

    #[test]
    fn test_unknown_source_type_tolerated() {
        let json = r##"{"id":"x","title":"t","documentLink":"#","sourceType":"Preprint"}"##;
        let record: NormalizedRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.source_type, SourceType::Unknown);
    }

    #[test]
    fn test_publication_year() {
        let json = r##"{"id":"x","title":"t","documentLink":"#","sourceType":"Journal","publicationDate":"2020-01-01"}"##;
        let mut record: NormalizedRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.publication_year(), Some(2020));
        record.publication_date = String::new();
        assert_eq!(record.publication_year(), None);
    }
}
