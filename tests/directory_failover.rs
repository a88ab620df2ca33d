//! Integration tests for the failover directory client and its cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};

use rhythmee::clock::FixedClock;
use rhythmee::directory::{
    CachedDirectory, MockTransport, RadioDirectoryClient, SearchParams, COUNTRIES_CACHE_KEY,
};
use rhythmee::report::MockErrorReporter;
use rhythmee::storage::{KeyValueStore, MemoryStorage};

// ============================================================================
// Test Helpers
// ============================================================================

fn mirror_pool(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://m{i}.example")).collect()
}

fn client(
    transport: &Arc<MockTransport>,
    reporter: &Arc<MockErrorReporter>,
    pool: Vec<String>,
) -> RadioDirectoryClient {
    RadioDirectoryClient::with_mirrors(transport.clone(), reporter.clone(), pool)
        .with_retry_delay(Duration::from_millis(0))
}

// ============================================================================
// Mirror Failover
// ============================================================================

#[tokio::test]
async fn test_single_healthy_mirror_among_eight_serves_the_search() {
    let transport = Arc::new(MockTransport::new());
    let reporter = Arc::new(MockErrorReporter::new());
    let pool = mirror_pool(8);
    for base in pool.iter().take(7) {
        transport.fail_for(base.clone(), "connection reset");
    }
    transport.succeed_for(pool[7].clone(), r#"[{"name":"Test Radio"}]"#);

    let client = client(&transport, &reporter, pool);
    let stations = client.search(&SearchParams::named("test")).await;

    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].name, "Test Radio");
    // No more than one attempt per endpoint.
    assert!(transport.call_count() <= 8);
    assert_eq!(reporter.report_count(), 0);
}

#[tokio::test]
async fn test_exhausted_pool_yields_empty_result_and_one_report() {
    let transport = Arc::new(MockTransport::new());
    let reporter = Arc::new(MockErrorReporter::new());
    let pool = mirror_pool(8);
    for base in &pool {
        transport.fail_for(base.clone(), "503");
    }

    let client = client(&transport, &reporter, pool);
    let stations = client.search(&SearchParams::named("test")).await;

    assert!(stations.is_empty());
    assert_eq!(transport.call_count(), 8);
    assert_eq!(reporter.report_count(), 1);

    let (context, message) = reporter.reports().remove(0);
    assert_eq!(context, "radio-directory");
    assert!(message.contains('8'));
}

#[tokio::test]
async fn test_country_ordering_property() {
    let transport = Arc::new(MockTransport::new());
    let reporter = Arc::new(MockErrorReporter::new());
    let pool = mirror_pool(1);
    transport.succeed_for(
        pool[0].clone(),
        r#"[
            {"name":"A","iso_3166_1":"AA","stationcount":5},
            {"name":"B","iso_3166_1":"BB","stationcount":0},
            {"name":"C","iso_3166_1":"CC","stationcount":900},
            {"name":"D","iso_3166_1":"DD","stationcount":42},
            {"name":"E","iso_3166_1":"EE","stationcount":0}
        ]"#,
    );

    let client = client(&transport, &reporter, pool);
    let countries = client.list_countries().await;

    // Zero-count entries excluded, the rest strictly descending.
    assert_eq!(
        countries.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["C", "D", "A"]
    );
    assert!(countries.iter().all(|c| c.stationcount > 0));
}

#[tokio::test]
async fn test_tag_cap_property() {
    let transport = Arc::new(MockTransport::new());
    let reporter = Arc::new(MockErrorReporter::new());
    let pool = mirror_pool(1);

    let entries: Vec<String> = (0..300)
        .map(|i| format!(r#"{{"name":"t{i}","stationcount":{}}}"#, i + 1))
        .collect();
    transport.succeed_for(pool[0].clone(), format!("[{}]", entries.join(",")));

    let client = client(&transport, &reporter, pool);
    let tags = client.list_tags().await;

    assert_eq!(tags.len(), 100);
    assert!(tags.iter().all(|t| t.stationcount > 10));
    assert!(tags
        .windows(2)
        .all(|w| w[0].stationcount >= w[1].stationcount));
    // The cap keeps the highest counts.
    assert_eq!(tags[0].stationcount, 300);
}

// ============================================================================
// Cache Layer
// ============================================================================

#[tokio::test]
async fn test_cached_countries_survive_a_mirror_outage() {
    let transport = Arc::new(MockTransport::new());
    let reporter = Arc::new(MockErrorReporter::new());
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(FixedClock::new(
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let pool = mirror_pool(2);
    transport.succeed_for(
        pool[0].clone(),
        r#"[{"name":"Japan","iso_3166_1":"JP","stationcount":120}]"#,
    );
    transport.succeed_for(
        pool[1].clone(),
        r#"[{"name":"Japan","iso_3166_1":"JP","stationcount":120}]"#,
    );

    let directory = CachedDirectory::new(
        client(&transport, &reporter, pool.clone()),
        storage.clone(),
        clock.clone(),
    );

    // Populate, then take every mirror down.
    assert_eq!(directory.countries().await.len(), 1);
    assert!(storage.get(COUNTRIES_CACHE_KEY).unwrap().is_some());
    for base in &pool {
        transport.fail_for(base.clone(), "down");
    }

    // Fresh window: served from cache, no network.
    let calls = transport.call_count();
    clock.advance(chrono::Duration::hours(12));
    assert_eq!(directory.countries().await.len(), 1);
    assert_eq!(transport.call_count(), calls);

    // Stale window with the pool down: refetch fails, stale entries served.
    clock.advance(chrono::Duration::hours(13));
    assert_eq!(directory.countries().await.len(), 1);
    assert!(transport.call_count() > calls);
}
