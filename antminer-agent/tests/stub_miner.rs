//! End-to-end polling against the devkit stub miner

use antminer_agent::commands::{self, UNAVAILABLE};
use antminer_agent::{
    DiscoveryKind, DiscoveryMode, Dialect, MinerClient, MinerConfig, MinerError, Thresholds,
};
use antminer_devkit::test_utils::{closed_port, PASSWORD, USERNAME};
use antminer_devkit::{sample_s19k_pro, ChainBuilder, StatusBuilder, StubResponse, TestHarness};
use serde_json::{json, Value};
use std::time::Duration;

fn client_for(harness: &TestHarness) -> MinerClient {
    let config = MinerConfig::new(harness.host(), harness.port(), USERNAME, PASSWORD);
    MinerClient::new(config).unwrap()
}

#[tokio::test]
async fn test_fetch_with_digest_auth() {
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let doc = client_for(&harness).fetch_status().await.unwrap();

    assert_eq!(doc.raw(), &sample_s19k_pro());
    assert_eq!(harness.miner.requests().len(), 2);
    harness.assert_authenticated_once().unwrap();
    harness.assert_all_requests_to("/cgi-bin/stats.cgi").unwrap();
}

#[tokio::test]
async fn test_get_values() {
    let doc = StatusBuilder::new()
        .fan(4200)
        .fan(3900)
        .chain(ChainBuilder::new(0).freq_avg(593))
        .chain(ChainBuilder::new(1).freq_avg(600))
        .build();
    let harness = TestHarness::serving(&doc).await.unwrap();
    let client = client_for(&harness);

    assert_eq!(commands::get(&client, "STATS.chain.1.freq_avg", Dialect::Extended).await, "600");
    assert_eq!(commands::get(&client, "STATS.fan.0", Dialect::Extended).await, "4200");
    assert_eq!(commands::get(&client, "STATS.miner_mode", Dialect::Extended).await, "0");
    assert_eq!(commands::get(&client, "INFO.type", Dialect::Extended).await, "Antminer S19k Pro");
    assert_eq!(commands::get(&client, "STATUS.STATUS", Dialect::Extended).await, "S");
    assert_eq!(commands::get(&client, "STATS.chain.0.temp_chip.2", Dialect::Extended).await, "73");
}

#[tokio::test]
async fn test_get_unknown_item_is_zero() {
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let client = client_for(&harness);

    assert_eq!(commands::get(&client, "STATS.chain.9.freq_avg", Dialect::Extended).await, UNAVAILABLE);
    assert_eq!(commands::get(&client, "STATS.fan.4", Dialect::Extended).await, UNAVAILABLE);
    assert_eq!(commands::get(&client, "INFO.type", Dialect::Basic).await, UNAVAILABLE);

    // Rejected before any request is made
    let before = harness.miner.requests().len();
    assert_eq!(commands::get(&client, "POOLS.0.url", Dialect::Extended).await, UNAVAILABLE);
    assert_eq!(harness.miner.requests().len(), before);
}

#[tokio::test]
async fn test_discovery_documents() {
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let client = client_for(&harness);

    let chains: Value = serde_json::from_str(
        &commands::discover_items(&client, DiscoveryKind::Chains, DiscoveryMode::Enumerate).await,
    )
    .unwrap();
    assert_eq!(
        chains,
        json!({"data": [{"{#CHAINID}": "0"}, {"{#CHAINID}": "1"}, {"{#CHAINID}": "2"}]})
    );

    let fans: Value = serde_json::from_str(
        &commands::discover_items(&client, DiscoveryKind::Fans, DiscoveryMode::Count).await,
    )
    .unwrap();
    assert_eq!(fans["data"].as_array().unwrap().len(), 4);
    assert_eq!(fans["data"][3]["{#FANID}"], "3");
}

#[tokio::test]
async fn test_wrong_credentials() {
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let config = MinerConfig::new(harness.host(), harness.port(), "admin", PASSWORD);
    let client = MinerClient::new(config).unwrap();

    let err = client.fetch_status().await.unwrap_err();
    assert!(matches!(err, MinerError::Auth(_)), "got {err:?}");
    assert_eq!(commands::get(&client, "STATS.fan.0", Dialect::Extended).await, UNAVAILABLE);
}

#[tokio::test]
async fn test_wrong_password() {
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let config = MinerConfig::new(harness.host(), harness.port(), USERNAME, "definitely-wrong");
    let client = MinerClient::new(config).unwrap();

    let err = client.fetch_status().await.unwrap_err();
    assert!(matches!(err, MinerError::Auth(_)), "got {err:?}");
    assert_eq!(commands::get(&client, "STATS.fan.0", Dialect::Extended).await, UNAVAILABLE);
    // Challenge, then exactly one rejected answer
    assert_eq!(harness.miner.requests().len(), 4);
    assert_eq!(harness.miner.authenticated_requests().len(), 2);
}

#[tokio::test]
async fn test_degraded_miner_document() {
    let body = StatusBuilder::new()
        .status("E")
        .info("miner_version", "uart_trans.1.2")
        .fan(2800)
        .chain(ChainBuilder::new(0).rates(36000.0, 40000.0))
        .to_body();
    let harness = TestHarness::with_response(StubResponse::Body(body)).await.unwrap();
    let client = client_for(&harness);

    assert_eq!(commands::get(&client, "STATUS.STATUS", Dialect::Extended).await, "E");
    assert_eq!(commands::get(&client, "INFO.miner_version", Dialect::Extended).await, "uart_trans.1.2");
    assert_eq!(commands::get(&client, "STATS.chain.0.rate", Dialect::Extended).await, "36000.0");

    colored::control::set_override(false);
    let report = commands::status(&client, &Thresholds::default()).await;
    assert!(report.contains("Firmware Version: uart_trans.1.2"));
    assert!(report.contains("Efficiency: 90.0%"));
    assert!(report.contains("Fan 1 Speed: 2800 RPM"));
}

#[tokio::test]
async fn test_corrupt_counter_gives_empty_discovery() {
    let doc = StatusBuilder::new()
        .stat("chain_num", json!(1_000_000_000_000u64))
        .chain(ChainBuilder::new(0))
        .build();
    let harness = TestHarness::serving(&doc).await.unwrap();
    let client = client_for(&harness);

    assert_eq!(
        commands::discover_items(&client, DiscoveryKind::Chains, DiscoveryMode::Count).await,
        r#"{"data":[]}"#
    );
    assert_eq!(
        commands::discover_items(&client, DiscoveryKind::Chains, DiscoveryMode::Enumerate).await,
        r#"{"data":[{"{#CHAINID}":"0"}]}"#
    );
}

#[tokio::test]
async fn test_watch_never_overlaps_polls() {
    let body = sample_s19k_pro().to_string();
    let harness = TestHarness::with_response(StubResponse::Delayed(Duration::from_millis(150), body))
        .await
        .unwrap();
    let client = client_for(&harness);

    // Ticks every 20ms while each poll takes at least 150ms
    let watching = commands::watch(&client, "STATS.fan.0", Dialect::Extended, Duration::from_millis(20));
    assert!(tokio::time::timeout(Duration::from_millis(800), watching).await.is_err());

    assert!(harness.miner.authenticated_requests().len() >= 2);
    assert_eq!(harness.miner.max_in_flight(), 1);
}

#[tokio::test]
async fn test_non_json_body() {
    let harness = TestHarness::with_response(StubResponse::Body("<html>busy</html>".into()))
        .await
        .unwrap();
    let client = client_for(&harness);

    assert!(matches!(client.fetch_status().await, Err(MinerError::Decode(_))));
    assert_eq!(
        commands::discover_items(&client, DiscoveryKind::Chains, DiscoveryMode::Enumerate).await,
        r#"{"data":[]}"#
    );
}

#[tokio::test]
async fn test_server_error_status() {
    let harness = TestHarness::with_response(StubResponse::Status(500, "oops".into()))
        .await
        .unwrap();
    let err = client_for(&harness).fetch_status().await.unwrap_err();
    assert!(matches!(err, MinerError::Http(status) if status.as_u16() == 500));
}

#[tokio::test]
async fn test_connection_refused_defaults() {
    let port = closed_port().await.unwrap();
    let client = MinerClient::new(MinerConfig::new("127.0.0.1", port, USERNAME, PASSWORD)).unwrap();

    assert!(matches!(client.fetch_status().await, Err(MinerError::Transport(_))));
    assert_eq!(commands::get(&client, "STATS.fan.0", Dialect::Extended).await, UNAVAILABLE);
    assert_eq!(
        commands::discover_items(&client, DiscoveryKind::Fans, DiscoveryMode::Enumerate).await,
        r#"{"data":[]}"#
    );
    let report = commands::status(&client, &Thresholds::default()).await;
    assert!(report.contains("Connection error"));
}

#[tokio::test]
async fn test_timeout() {
    let harness = TestHarness::with_response(StubResponse::Silent).await.unwrap();
    let config = MinerConfig::new(harness.host(), harness.port(), USERNAME, PASSWORD);
    let client = MinerClient::with_timeout(config, Duration::from_millis(300)).unwrap();

    let started = std::time::Instant::now();
    let err = client.fetch_status().await.unwrap_err();
    assert!(matches!(&err, MinerError::Transport(e) if e.is_timeout()), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_status_report() {
    colored::control::set_override(false);
    let harness = TestHarness::serving(&sample_s19k_pro()).await.unwrap();
    let client = client_for(&harness);

    let report = commands::status(&client, &Thresholds::default()).await;
    assert!(report.contains("Connecting to miner at: http://127.0.0.1:"));
    assert!(report.contains("Model: Antminer S19k Pro"));
    assert!(report.contains("Number of Fans: 4"));
    assert!(report.contains("Serial Number: JYZZ3BCBDJAJF0002"));
    assert!(report.contains("Hardware Errors: 2"));
}
