//! Server-assisted incremental loading against a mocked relay.

use bioknowledge::engine::{EngineState, Session};
use bioknowledge::osdr::OsdrClient;
use bioknowledge::record::SourceFilter;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn summary(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "documentLink": format!("http://rest/{}", id),
        "publicationDate": "2020-02-01",
        "sourceType": "OSDR",
    })
}

fn page(ids: std::ops::Range<usize>) -> serde_json::Value {
    let summaries: Vec<serde_json::Value> = ids
        .map(|i| summary(&format!("OSD-{}", i), &format!("Study {}", i)))
        .collect();
    json!(summaries)
}

async fn session_with_initial_page(relay: &MockServer) -> (Session, OsdrClient) {
    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0..10)))
        .mount(relay)
        .await;

    let client = OsdrClient::new(&relay.uri()).expect("client");
    let initial = client.fetch_page(0, 10).await.expect("initial page");

    let mut state = EngineState::new();
    state.load_batch(initial);
    state.mark_loaded();
    state.set_source(SourceFilter::Osdr);
    (Session::new(state), client)
}

#[tokio::test]
async fn load_more_fetches_next_page_at_resident_offset() {
    let relay = MockServer::start().await;
    let (session, client) = session_with_initial_page(&relay).await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(10..14)))
        .mount(&relay)
        .await;

    assert_eq!(session.read(|s| s.visible().len()), 10);

    let grew = session.load_more(Some(&client)).await.expect("load more");
    assert!(grew);

    session.read(|s| {
        assert_eq!(s.total_results(), 14);
        assert_eq!(s.visible().len(), 14);
        assert_eq!(s.resident_osdr_count(), 14);
        assert_eq!(s.visible()[10].id, "OSD-10");
        assert!(!s.show_load_more());
    });
}

#[tokio::test]
async fn load_more_with_empty_page_changes_nothing() {
    let relay = MockServer::start().await;
    let (session, client) = session_with_initial_page(&relay).await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&relay)
        .await;

    let grew = session.load_more(Some(&client)).await.expect("load more");
    assert!(!grew);

    session.read(|s| {
        assert_eq!(s.display_count(), 10);
        assert_eq!(s.total_results(), 10);
        assert!(!s.show_load_more());
    });
}

#[tokio::test]
async fn failed_fetch_leaves_state_intact() {
    let relay = MockServer::start().await;
    let (session, client) = session_with_initial_page(&relay).await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&relay)
        .await;

    let result = session.load_more(Some(&client)).await;
    assert!(result.is_err());

    session.read(|s| {
        assert_eq!(s.display_count(), 10);
        assert_eq!(s.total_results(), 10);
        assert_eq!(s.resident_osdr_count(), 10);
    });
}

#[tokio::test]
async fn query_change_resets_pagination_progress() {
    let relay = MockServer::start().await;
    let (session, client) = session_with_initial_page(&relay).await;

    Mock::given(method("GET"))
        .and(path("/datasets"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(10..20)))
        .mount(&relay)
        .await;

    session.load_more(Some(&client)).await.expect("load more");
    assert_eq!(session.read(|s| s.display_count()), 20);

    session.set_query("Study 1".to_string());
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    session.read(|s| {
        assert_eq!(s.display_count(), 10);
        // "Study 1" matches Study 1 and Study 10..19.
        assert_eq!(s.total_results(), 11);
        assert_eq!(s.visible().len(), 10);
        assert!(s.show_load_more());
    });
}
