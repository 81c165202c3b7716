//! End-to-end pipeline: adapt both sources, merge, filter.

use bioknowledge::filter;
use bioknowledge::journal::{self, JournalRow};
use bioknowledge::merge;
use bioknowledge::osdr::{self, StudySummary};
use bioknowledge::record::SourceFilter;
use serde_json::json;

fn sample_collection() -> Vec<bioknowledge::record::NormalizedRecord> {
    let row: JournalRow = serde_json::from_value(json!({
        "Title": "Effects of Microgravity",
        "Link": "http://x",
        "Authors": "A;B;C",
        "Year": "2020",
        "JournalName": "",
    }))
    .expect("row");
    let journal_batch = vec![journal::adapt_row(&row, 0)];

    let summary: StudySummary = serde_json::from_value(json!({
        "id": {"accession": "OSD-100"},
        "study_title": "Bone Loss Study",
        "start_date": 1580515200,
    }))
    .expect("summary");
    let osdr_batch = osdr::adapt_batch(&[summary]);

    merge::merge(vec![journal_batch, osdr_batch])
}

#[test]
fn merging_both_sources_yields_two_distinct_records() {
    let merged = sample_collection();
    assert_eq!(merged.len(), 2);
    assert!(merge::ids_are_unique(&merged));

    let journal = &merged[0];
    assert_eq!(journal.id, "journal-0");
    assert_eq!(journal.authors, vec!["A", "B", "C"]);
    assert_eq!(journal.publication_date, "2020-01-01");

    let study = &merged[1];
    assert_eq!(study.id, "OSD-100");
    assert_eq!(study.title, "Bone Loss Study");
    assert_eq!(study.publication_date, "2020-02-01");
}

#[test]
fn osdr_source_filter_with_empty_query_keeps_only_studies() {
    let merged = sample_collection();
    let filtered = filter::apply(&merged, SourceFilter::Osdr, "");
    let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["OSD-100"]);
}
