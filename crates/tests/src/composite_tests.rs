//! The composite round: critical price and weather, best-effort headlines.

use oracle_core::{
    state::PersistentState, CompositeRequest, OracleContract, OracleError,
};
use serde_json::json;

use crate::mock_infrastructure::{listing_body, mock_config, rss_body, UpstreamMock};

fn london(news_limit: u32) -> CompositeRequest {
    CompositeRequest {
        city: "London".into(),
        latitude: "51.5074".into(),
        longitude: "-0.1278".into(),
        news_limit,
    }
}

async fn upstream_with_price_and_weather() -> UpstreamMock {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "ETH", "3000").await;
    upstream
        .json(
            "/weather/51.5074/-0.1278",
            &json!({ "current_weather": { "temperature": 14.2, "weathercode": 3 } }),
        )
        .await;
    upstream
}

#[tokio::test]
async fn test_update_all_commits_every_field() {
    let mut upstream = upstream_with_price_and_weather().await;
    upstream.json("/news/listing", &listing_body(6)).await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let report = contract.update_all(london(10)).await.unwrap();
    assert_eq!(report.flavor, "composite");

    let status = contract.status();
    assert!((status.price - 3000.0).abs() < f64::EPSILON);
    assert_eq!(status.source, "a");
    assert_eq!(status.symbol, "ETH");
    assert!((status.temperature - 14.2).abs() < 1e-9);
    assert_eq!(status.condition, "3");
    assert_eq!(status.city, "London");
    assert_eq!(status.news_count, 6);
}

#[tokio::test]
async fn test_listing_403_counts_as_no_headlines() {
    let mut upstream = upstream_with_price_and_weather().await;
    upstream.status("/news/listing", 403).await;
    upstream.never("/news/rss").await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    contract.update_all(london(10)).await.unwrap();
    assert_eq!(contract.status().news_count, 0);
    upstream.verify().await;
}

#[tokio::test]
async fn test_rss_fallback_is_capped_by_limit() {
    let mut upstream = upstream_with_price_and_weather().await;
    upstream.status("/news/listing", 500).await;
    upstream.text("/news/rss", &rss_body(12)).await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    contract.update_all(london(5)).await.unwrap();
    assert_eq!(contract.status().news_count, 5);
}

#[tokio::test]
async fn test_news_outage_degrades_to_zero() {
    let mut upstream = upstream_with_price_and_weather().await;
    upstream.status("/news/listing", 500).await;
    upstream.status("/news/rss", 502).await;

    let config = mock_config(&upstream.url(), &["a"]);
    let previous = PersistentState { news_count: 9, ..PersistentState::default() };
    let mut contract = OracleContract::with_http(&config, previous).unwrap();

    contract.update_all(london(10)).await.unwrap();
    assert_eq!(contract.status().news_count, 0);
    assert_eq!(contract.status().city, "London");
}

#[tokio::test]
async fn test_weather_outage_aborts_whole_round() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "ETH", "3000").await;
    upstream.status("/weather/51.5074/-0.1278", 500).await;

    let config = mock_config(&upstream.url(), &["a"]);
    let before = PersistentState { price: 42.0, news_count: 3, ..PersistentState::default() };
    let mut contract = OracleContract::with_http(&config, before.clone()).unwrap();

    let err = contract.update_all(london(10)).await.unwrap_err();
    assert!(matches!(err, OracleError::Exhausted { .. }));
    assert_eq!(contract.state(), &before);
}

#[tokio::test]
async fn test_bad_coordinates_rejected_before_fetching() {
    let mut upstream = UpstreamMock::new().await;
    upstream.never("/a/price/ETH").await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let mut request = london(10);
    request.latitude = "123.0".into();
    let err = contract.update_all(request).await.unwrap_err();
    assert!(matches!(err, OracleError::Configuration(_)));
    upstream.verify().await;
}
