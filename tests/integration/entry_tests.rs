//! Integration test for the `run_years` entry point
//!
//! `run_years` reads its endpoint and key from the environment and writes into
//! the working directory, so this binary holds a single test that owns both.

use games_harvest::config::{API_KEY_ENV, BASE_URL_ENV};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_run_years_uses_environment_and_writes_csv() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("key", "env-key"))
        .and(query_param("dates", "2018-01-01,2018-12-31"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": null,
            "results": [
                {"id": 1, "name": "First", "released": "2018-02-01"},
                {"id": 2, "name": "Second", "released": "2018-09-12"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("dates", "2019-01-01,2019-12-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    std::env::set_var(API_KEY_ENV, "env-key");
    std::env::set_var(BASE_URL_ENV, format!("{}/api/games", server.uri()));
    std::env::set_current_dir(dir.path()).unwrap();

    let run = games_harvest::run_years(2018, 2019, false, false)
        .await
        .expect("run");

    assert_eq!(run.report.records.len(), 2);
    assert_eq!(run.report.failed(), 0);
    assert_eq!(run.statistics.total_records, 2);

    let csv = std::fs::read_to_string(dir.path().join("games_parallel_2018_2019.csv")).unwrap();
    let mut lines = csv.trim_start_matches('\u{feff}').lines();
    assert_eq!(lines.next(), Some("id,name,released"));
    assert_eq!(lines.count(), 2);

    let log = std::fs::read_to_string(dir.path().join("api_client.log")).unwrap();
    assert!(log.contains("Collected 2 games"));
    assert!(!log.contains("env-key"));
}
