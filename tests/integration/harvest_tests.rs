//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the games API and exercise the
//! page fetcher, year walker, coordinator and result sink end-to-end.

use games_harvest::config::{Config, YearRange};
use games_harvest::harvest::{walk_year, Coordinator, GameApiClient, StopReason, YearOutcome};
use games_harvest::logging::LogContext;
use games_harvest::{ConfigError, FetchError, HarvestError, Harvester, Verbosity};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETRY_DELAY_MS: u64 = 40;

/// Creates a test configuration pointing at the mock server, with short delays
fn create_test_config(server: &MockServer, dir: &TempDir, start: i32, end: i32) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api/games", server.uri());
    config.api.api_key = Some("test-key".to_string());
    config.api.request_timeout_secs = 5;
    config.fetch.politeness_delay_ms = 1;
    config.fetch.retry_delay_ms = RETRY_DELAY_MS;
    config.fetch.max_retry_delay_ms = 1000;
    config.years = YearRange { start, end };
    config.output.directory = dir.path().join("out").to_string_lossy().into_owned();
    config.logging.file = dir.path().join("harvest.log").to_string_lossy().into_owned();
    config
}

fn games(year: i32, page: u32, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "id": year as i64 * 10_000 + page as i64 * 100 + i as i64,
                "name": format!("Game {} {} {}", year, page, i),
                "released": format!("{}-06-01", year),
            })
        })
        .collect()
}

fn page_body(server: &MockServer, records: Vec<Value>, next_page: Option<u32>) -> Value {
    json!({
        "count": records.len(),
        "next": next_page.map(|p| format!("{}/api/games?page={}", server.uri(), p)),
        "results": records,
    })
}

fn dates(year: i32) -> String {
    format!("{}-01-01,{}-12-31", year, year)
}

async fn mount_page(server: &MockServer, year: i32, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("dates", dates(year).as_str()))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, year: i32, page: u32, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("dates", dates(year).as_str()))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Pages requested for `year`, in request order
async fn requested_pages(server: &MockServer, year: i32) -> Vec<u32> {
    let expected = dates(year);
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .filter(|req| {
            req.url
                .query_pairs()
                .any(|(k, v)| k == "dates" && v == expected.as_str())
        })
        .filter_map(|req| {
            req.url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
        })
        .collect()
}

/// Two pages of 40 for 2018 and a single empty page for 2019
async fn mount_two_year_scenario(server: &MockServer) {
    mount_page(server, 2018, 1, page_body(server, games(2018, 1, 40), Some(2))).await;
    mount_page(server, 2018, 2, page_body(server, games(2018, 2, 40), None)).await;
    mount_page(server, 2019, 1, page_body(server, vec![], None)).await;
}

fn sorted_ids(records: &[games_harvest::Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().filter_map(|r| r["id"].as_i64()).collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn test_two_year_scenario() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_year_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2018, 2019);
    let client = GameApiClient::new(&config).expect("client");
    let coordinator = Coordinator::new(client, config.fetch.clone());

    let report = coordinator.run(config.years).await;

    assert_eq!(report.records.len(), 80);
    assert_eq!(report.years.len(), 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.partial(), 0);

    match report.outcome_for(2019).expect("2019 outcome") {
        YearOutcome::Succeeded(summary) => {
            assert_eq!(summary.record_count, 0);
            assert_eq!(summary.stop, StopReason::Exhausted);
        }
        other => panic!("2019 should succeed empty, got {:?}", other),
    }

    match report.outcome_for(2018).expect("2018 outcome") {
        YearOutcome::Succeeded(summary) => {
            assert_eq!(summary.record_count, 80);
            assert_eq!(summary.pages_fetched, 2);
        }
        other => panic!("2018 should succeed, got {:?}", other),
    }

    assert_eq!(requested_pages(&server, 2018).await, vec![1, 2]);
    assert_eq!(requested_pages(&server, 2019).await, vec![1]);
}

#[tokio::test]
async fn test_502_is_retried_on_the_same_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("dates", dates(2015).as_str()))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, 2015, 1, page_body(&server, games(2015, 1, 3), None)).await;

    let config = create_test_config(&server, &dir, 2015, 2015);
    let client = GameApiClient::new(&config).expect("client");

    let started = Instant::now();
    let report = walk_year(&client, 2015, &config.fetch).await;
    let elapsed = started.elapsed();

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.stop, StopReason::Exhausted);
    assert_eq!(requested_pages(&server, 2015).await, vec![1, 1, 1]);
    assert!(
        elapsed >= Duration::from_millis(2 * RETRY_DELAY_MS),
        "expected two retry delays, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_status(&server, 2015, 1, 502).await;

    let mut config = create_test_config(&server, &dir, 2015, 2015);
    config.fetch.max_retries = 2;
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2015, &config.fetch).await;

    assert!(report.records.is_empty());
    assert_eq!(
        report.stop,
        StopReason::Failed {
            page: 1,
            error: FetchError::RetriesExhausted { attempts: 3 },
        }
    );
    assert_eq!(requested_pages(&server, 2015).await, vec![1, 1, 1]);
}

#[tokio::test]
async fn test_first_page_failure_yields_empty_year() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_status(&server, 2016, 1, 500).await;
    mount_page(&server, 2017, 1, page_body(&server, games(2017, 1, 5), None)).await;

    let config = create_test_config(&server, &dir, 2016, 2017);
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2016, &config.fetch).await;
    assert!(report.records.is_empty());
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(
        report.stop,
        StopReason::Failed {
            page: 1,
            error: FetchError::Status { status: 500 },
        }
    );

    let coordinator = Coordinator::new(client, config.fetch.clone());
    let aggregate = coordinator.run(config.years).await;
    assert_eq!(aggregate.records.len(), 5);
    assert_eq!(aggregate.partial(), 1);
    assert_eq!(aggregate.failed(), 0);
    assert!(aggregate.outcome_for(2016).unwrap().is_partial());
}

#[tokio::test]
async fn test_failure_midway_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, 2014, 1, page_body(&server, games(2014, 1, 40), Some(2))).await;
    mount_status(&server, 2014, 2, 404).await;

    let config = create_test_config(&server, &dir, 2014, 2014);
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2014, &config.fetch).await;

    assert_eq!(report.records.len(), 40);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(
        report.stop,
        StopReason::Failed {
            page: 2,
            error: FetchError::Status { status: 404 },
        }
    );
    assert_eq!(requested_pages(&server, 2014).await, vec![1, 2]);
}

#[tokio::test]
async fn test_empty_page_ends_walk() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, 2013, 1, page_body(&server, games(2013, 1, 40), Some(2))).await;
    mount_page(&server, 2013, 2, page_body(&server, games(2013, 2, 7), Some(3))).await;
    mount_page(&server, 2013, 3, page_body(&server, vec![], Some(4))).await;

    let config = create_test_config(&server, &dir, 2013, 2013);
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2013, &config.fetch).await;

    assert_eq!(report.records.len(), 47);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.stop, StopReason::Exhausted);
    assert_eq!(requested_pages(&server, 2013).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_page_ceiling_truncates_silently() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Every page advertises a following one
    Mock::given(method("GET"))
        .and(path("/api/games"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body(&server, games(2012, 1, 10), Some(99))),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &dir, 2012, 2012);
    config.fetch.max_pages = 3;
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2012, &config.fetch).await;

    assert_eq!(report.records.len(), 30);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.stop, StopReason::PageLimit);
    assert_eq!(requested_pages(&server, 2012).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_request_carries_key_and_page_size() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/games"))
        .and(query_param("key", "test-key"))
        .and(query_param("dates", "2011-01-01,2011-12-31"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&server, games(2011, 1, 2), None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, 2011, 2011);
    let client = GameApiClient::new(&config).expect("client");

    let page = client.fetch_page(2011, 1).await.expect("page");
    assert_eq!(page.records.len(), 2);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_invalid_json_is_a_decode_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/games"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, 2010, 2010);
    let client = GameApiClient::new(&config).expect("client");

    let result = client.fetch_page(2010, 1).await;
    match result {
        Err(FetchError::Decode(message)) => assert!(!message.contains("test-key")),
        other => panic!("expected decode failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_year_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2018, 2019);
    let client = GameApiClient::new(&config).expect("client");
    let coordinator = Coordinator::new(client, config.fetch.clone());

    let first = coordinator.run(config.years).await;
    let second = coordinator.run(config.years).await;

    assert_eq!(first.records.len(), second.records.len());
    assert_eq!(sorted_ids(&first.records), sorted_ids(&second.records));
}

#[tokio::test]
async fn test_harvester_writes_csv_and_log() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_year_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2018, 2019);
    let log_file = config.logging.file.clone();
    let harvester = Harvester::new(config, Verbosity::Normal).expect("harvester");

    let run = harvester.run().await.expect("run");
    drop(harvester);

    assert_eq!(run.statistics.total_records, 80);
    assert_eq!(
        run.output_path,
        dir.path().join("out").join("games_parallel_2018_2019.csv")
    );

    let csv = std::fs::read_to_string(&run.output_path).unwrap();
    let csv = csv.trim_start_matches('\u{feff}');
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,name,released"));
    assert_eq!(lines.count(), 80);

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("Collected 80 games"));
    assert!(log.contains("Data saved to file"));
}

#[tokio::test]
async fn test_harvester_writes_json() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, 2009, 1, page_body(&server, games(2009, 1, 4), None)).await;

    let mut config = create_test_config(&server, &dir, 2009, 2009);
    config.output.format = games_harvest::config::OutputFormat::Json;
    let harvester =
        Harvester::with_log_context(config, LogContext::disabled()).expect("harvester");

    let run = harvester.run().await.expect("run");

    assert!(run.output_path.ends_with("games_parallel_2009_2009.json"));
    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&run.output_path).unwrap()).unwrap();
    assert_eq!(written.as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn test_harvester_requires_api_key() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, &dir, 2018, 2019);
    config.api.api_key = None;

    let result = Harvester::with_log_context(config, LogContext::disabled());
    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::MissingApiKey))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_null_results_end_the_year() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, 2008, 1, page_body(&server, games(2008, 1, 40), Some(2))).await;
    mount_page(&server, 2008, 2, json!({"results": null, "next": null})).await;

    let config = create_test_config(&server, &dir, 2008, 2008);
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2008, &config.fetch).await;

    assert_eq!(report.records.len(), 40);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.stop, StopReason::Exhausted);
}

#[tokio::test]
async fn test_false_next_keeps_the_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(
        &server,
        2007,
        1,
        json!({"results": [{"id": 1}, {"id": 2}], "next": false}),
    )
    .await;

    let config = create_test_config(&server, &dir, 2007, 2007);
    let client = GameApiClient::new(&config).expect("client");

    let report = walk_year(&client, 2007, &config.fetch).await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.stop, StopReason::Exhausted);
    assert_eq!(requested_pages(&server, 2007).await, vec![1]);
}

#[tokio::test]
async fn test_harvest_fetches_without_writing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_year_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2018, 2019);
    let log_file = config.logging.file.clone();
    let harvester = Harvester::new(config, Verbosity::Normal).expect("harvester");
    let output_path = harvester.output_path();

    let report = harvester.harvest().await;
    drop(harvester);

    assert_eq!(report.records.len(), 80);
    assert_eq!(report.years.len(), 2);
    assert!(!output_path.exists());

    let log = std::fs::read_to_string(&log_file).unwrap();
    assert!(!log.is_empty());
    assert!(!log.contains("Data saved to file"));
}

#[tokio::test]
async fn test_missing_key_leaves_previous_log_alone() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, &dir, 2018, 2019);
    config.api.api_key = None;
    std::fs::write(&config.logging.file, "previous run\n").unwrap();
    let log_file = config.logging.file.clone();

    let result = Harvester::new(config, Verbosity::Normal);

    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::MissingApiKey))
    ));
    assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "previous run\n");
}
