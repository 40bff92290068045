//! Store backend tests: the gist backend against a mock GitHub API, the local
//! backend against a temporary directory.

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use article_checker::config::GistConfig;
use article_checker::error::StoreError;
use article_checker::keys;
use article_checker::models::{CachedAuthor, SentPaperRecord};
use article_checker::store::{GistStore, KeyedRecordStore, LocalFileStore, RecordMap, index_records};

const GIST_ID: &str = "abc123";
const SENT_FILE: &str = "sent_papers.csv";

fn gist_config(server: &MockServer) -> GistConfig {
    let mut config = GistConfig::new(GIST_ID, "ghp_token");
    config.api_url = server.uri();
    config
}

fn sent_store(server: &MockServer) -> GistStore<SentPaperRecord> {
    GistStore::new(&gist_config(server), SENT_FILE).unwrap()
}

fn record(id: &str, title: &str, day: u32) -> SentPaperRecord {
    SentPaperRecord {
        paper_id: id.to_string(),
        doi: None,
        title: title.to_string(),
        source: "PRX Quantum".into(),
        source_symbol: "PRX-Q".into(),
        sent_at: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
        citation_label: "Smith_Title".into(),
    }
}

fn gist_body(files: serde_json::Value) -> serde_json::Value {
    json!({ "id": GIST_ID, "files": files })
}

// =============================================================================
// Gist Load
// =============================================================================

#[tokio::test]
async fn test_gist_load_parses_csv_rows() {
    let server = MockServer::start().await;
    let csv = "paper_id,doi,title,source,source_symbol,sent_at,citation_label\n\
               10.1103/x,10.1103/x,\"Gates, \"\"fast\"\" ones\",PRX Quantum,PRX-Q,2025-01-02T00:00:00,Smith_Gates\n\
               oai:arXiv.org:2501.00001v1,,Second,arXiv:quant-ph,arxiv/quant-ph,not-a-date,\n";

    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .and(header("authorization", "token ghp_token"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({
            SENT_FILE: { "filename": SENT_FILE, "content": csv, "truncated": false }
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let records = sent_store(&server).load().await.unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[&keys::paper_key("10.1103/x")];
    assert_eq!(first.title, "Gates, \"fast\" ones");
    assert_eq!(first.doi.as_deref(), Some("10.1103/x"));
    assert_eq!(first.sent_at, Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());

    let second = &records[&keys::paper_key("oai:arXiv.org:2501.00001v1")];
    assert_eq!(second.doi, None);
    assert_eq!(second.sent_at, article_checker::models::records::timestamp::fallback());
}

#[tokio::test]
async fn test_gist_missing_file_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({
            "author_cache.csv": { "content": "name,h_index\n" }
        }))))
        .mount(&server)
        .await;

    assert!(sent_store(&server).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gist_blank_file_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({
            SENT_FILE: { "content": "  \n" }
        }))))
        .mount(&server)
        .await;

    assert!(sent_store(&server).load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gist_truncated_file_reads_raw_url() {
    let server = MockServer::start().await;
    let raw_url = format!("{}/raw/{SENT_FILE}", server.uri());

    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({
            SENT_FILE: { "content": "paper_id,doi,ti", "truncated": true, "raw_url": raw_url }
        }))))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/raw/{SENT_FILE}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "paper_id,doi,title,source,source_symbol,sent_at,citation_label\np1,,Full,S,S,2025-01-01T00:00:00Z,\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let records = sent_store(&server).load().await.unwrap();
    assert_eq!(records[&keys::paper_key("p1")].title, "Full");
}

#[tokio::test]
async fn test_gist_load_failure_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    assert!(matches!(sent_store(&server).load().await, Err(StoreError::Client(_))));
}

// =============================================================================
// Gist Save
// =============================================================================

#[tokio::test]
async fn test_gist_save_patches_sorted_csv() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc123"))
        .and(header("authorization", "token ghp_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({}))))
        .expect(1)
        .mount(&server)
        .await;

    let records = index_records(vec![record("late", "Late", 20), record("early", "Early, with comma", 3)]);
    sent_store(&server).save(&records).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let content = body["files"][SENT_FILE]["content"].as_str().unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "paper_id,doi,title,source,source_symbol,sent_at,citation_label");
    assert!(lines[1].starts_with("early,,\"Early, with comma\",PRX Quantum,PRX-Q,2025-01-03T12:00:00"));
    assert!(lines[2].starts_with("late,,Late,"));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_gist_save_failure_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let records = index_records(vec![record("p1", "T", 1)]);
    assert!(sent_store(&server).save(&records).await.is_err());
}

#[tokio::test]
async fn test_gist_round_trip_author_cache() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({}))))
        .mount(&server)
        .await;

    let store: GistStore<CachedAuthor> = GistStore::new(&gist_config(&server), "author_cache.csv").unwrap();
    let metrics = article_checker::models::AuthorMetrics {
        h_index: Some(42),
        citation_count: None,
        paper_count: Some(7),
        profile_url: Some("https://www.semanticscholar.org/author/1".into()),
    };
    let authors = index_records(vec![CachedAuthor::new("Jane Doe", &metrics, Utc::now())]);
    store.save(&authors).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let content = body["files"]["author_cache.csv"]["content"].as_str().unwrap().to_string();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/gists/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist_body(json!({
            "author_cache.csv": { "content": content }
        }))))
        .mount(&server)
        .await;

    let loaded = store.load().await.unwrap();
    let entry = &loaded[&keys::author_key("jane doe")];
    assert_eq!(entry.h_index, Some(42));
    assert_eq!(entry.citation_count, None);
    assert_eq!(entry.paper_count, Some(7));
}

// =============================================================================
// Local Store
// =============================================================================

#[tokio::test]
async fn test_local_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store: LocalFileStore<SentPaperRecord> = LocalFileStore::new(dir.path().join("sent_papers.json"));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_round_trip_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sent_papers.json");
    let store: LocalFileStore<SentPaperRecord> = LocalFileStore::new(&path);

    let records = index_records(vec![record("a", "A", 1), record("b", "B", 2)]);
    store.save(&records).await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let loaded: RecordMap<SentPaperRecord> = store.load().await.unwrap();
    assert_eq!(loaded, records);
}

#[tokio::test]
async fn test_local_rekeys_entries_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sent_papers.json");
    std::fs::write(
        &path,
        r#"{"stale-key": {"paper_id": "p1", "title": "T", "source": "S", "sent_at": "2025-01-01T00:00:00"}}"#,
    )
    .unwrap();

    let store: LocalFileStore<SentPaperRecord> = LocalFileStore::new(&path);
    let loaded = store.load().await.unwrap();
    assert!(loaded.contains_key(&keys::paper_key("p1")));
    assert!(!loaded.contains_key("stale-key"));
}

#[tokio::test]
async fn test_local_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("author_cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store: LocalFileStore<CachedAuthor> = LocalFileStore::new(&path);
    assert!(matches!(store.load().await, Err(StoreError::Json(_))));
}
