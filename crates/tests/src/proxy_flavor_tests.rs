//! Contract rounds through the in-process price proxy.

use oracle_core::{state::PersistentState, OracleContract, OracleError, PriceFlavor};

use crate::mock_infrastructure::{mock_config, ProxyHarness, UpstreamMock};

/// Mock Binance answering the proxy's upstream ticker call.
async fn binance(price: &str) -> UpstreamMock {
    let mut upstream = UpstreamMock::new().await;
    upstream.json("/api/v3/ticker/price", &serde_json::json!({ "price": price })).await;
    upstream
}

#[tokio::test]
async fn test_proxy_round_records_upstream_label() {
    let upstream = binance("3000").await;
    let proxy = ProxyHarness::start(&upstream.url()).await.unwrap();

    let config = mock_config("http://unused.invalid", &[]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();
    contract.set_proxy_url(&proxy.proxy_url()).unwrap();

    contract.update_price(PriceFlavor::Proxy, "eth").await.unwrap();

    let view = contract.price();
    assert!((view.price - 3000.0).abs() < f64::EPSILON);
    assert_eq!(view.source, "binance-proxy");
    assert_eq!(view.symbol, "ETH");
}

#[tokio::test]
async fn test_proxy_unavailable_fails_round() {
    let mut upstream = UpstreamMock::new().await;
    upstream.status("/api/v3/ticker/price", 500).await;
    let proxy = ProxyHarness::start(&upstream.url()).await.unwrap();

    let config = mock_config("http://unused.invalid", &[]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();
    contract.set_proxy_url(&proxy.proxy_url()).unwrap();

    let err = contract.update_price(PriceFlavor::Proxy, "ETH").await.unwrap_err();
    assert!(matches!(err, OracleError::Exhausted { .. }), "got {err:?}");
    assert_eq!(contract.state(), &PersistentState {
        proxy_url: proxy.proxy_url(),
        ..PersistentState::default()
    });
}

#[tokio::test]
async fn test_proxy_without_url_is_configuration_error() {
    let config = mock_config("http://unused.invalid", &[]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let err = contract.update_price(PriceFlavor::Proxy, "ETH").await.unwrap_err();
    assert!(matches!(err, OracleError::Configuration(_)));
}
