//! Filter/search engine.
//!
//! Narrows the unfiltered collection by source selector and free-text query.
//! Stages run in a fixed order (source, then text, then the optional year
//! range) and each is a stable filter: output order equals input order and
//! no resorting happens.

use crate::record::{NormalizedRecord, SourceFilter};

/// Active filter inputs.
///
/// The year range is optional; when both bounds are `None` the year stage is
/// skipped entirely.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub source: SourceFilter,
    pub query: String,
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
}

impl Filters {
    pub fn new(source: SourceFilter, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
            year_start: None,
            year_end: None,
        }
    }

    fn year_stage_active(&self) -> bool {
        self.year_start.is_some() || self.year_end.is_some()
    }
}

/// Apply the source and text filters.
///
/// A record passes the source stage iff the selector is `all` or matches its
/// source type, and passes the text stage iff the query is empty or the
/// title contains it case-insensitively. Substring match only, no
/// tokenization, no ranking.
pub fn apply(
    all: &[NormalizedRecord],
    source: SourceFilter,
    query: &str,
) -> Vec<NormalizedRecord> {
    apply_filters(all, &Filters::new(source, query))
}

/// Apply the full filter set, including the optional year range.
///
/// When a year bound is set, records whose publication date has no parseable
/// year are excluded.
pub fn apply_filters(all: &[NormalizedRecord], filters: &Filters) -> Vec<NormalizedRecord> {
    let query = filters.query.to_lowercase();

    all.iter()
        .filter(|record| filters.source.matches(record.source_type))
        .filter(|record| query.is_empty() || record.title.to_lowercase().contains(&query))
        .filter(|record| {
            if !filters.year_stage_active() {
                return true;
            }
            match record.publication_year() {
                Some(year) => {
                    filters.year_start.map_or(true, |start| year >= start)
                        && filters.year_end.map_or(true, |end| year <= end)
                }
                None => false,
            }
        })
        .cloned()
        .collect()
}
