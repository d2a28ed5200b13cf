//! Ordered fallback across price sources over real HTTP.

use oracle_core::{
    consensus::RoundPhase, errors::SourceError, state::PersistentState, OracleContract,
    OracleError, PriceFlavor,
};

use crate::mock_infrastructure::{mock_config, UpstreamMock};

#[tokio::test]
async fn test_first_source_500_falls_back_to_second() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price_status("a", "ETH", 500).await;
    upstream.price("b", "ETH", "3000").await;

    let config = mock_config(&upstream.url(), &["a", "b"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let report = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();
    assert_eq!(report.phase, RoundPhase::Committed);

    let view = contract.price();
    assert!((view.price - 3000.0).abs() < f64::EPSILON);
    assert_eq!(view.source, "b");
    assert_eq!(view.symbol, "ETH");
}

#[tokio::test]
async fn test_later_sources_not_called_after_success() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "BTC", "65000.5").await;
    upstream.never("/b/price/BTC").await;

    let config = mock_config(&upstream.url(), &["a", "b"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    contract.update_price(PriceFlavor::PriceFeed, "btc").await.unwrap();
    assert_eq!(contract.price().source, "a");
    assert_eq!(contract.price().symbol, "BTC");
    upstream.verify().await;
}

#[tokio::test]
async fn test_implausible_and_malformed_readings_are_skipped() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("zero", "ETH", "0").await;
    upstream.text("/garbled/price/ETH", "<html>not json</html>").await;
    upstream.price("huge", "ETH", "250000").await;
    upstream.price("good", "ETH", "2999.99").await;

    let config = mock_config(&upstream.url(), &["zero", "garbled", "huge", "good"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();
    assert_eq!(contract.price().source, "good");
}

#[tokio::test]
async fn test_all_sources_fail_leaves_state_untouched() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price_status("a", "ETH", 503).await;
    upstream.price_status("b", "ETH", 404).await;

    let config = mock_config(&upstream.url(), &["a", "b"]);
    let before = PersistentState { price: 1.5, source: "old".into(), symbol: "ETH".into(), ..Default::default() };
    let mut contract = OracleContract::with_http(&config, before.clone()).unwrap();

    let err = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap_err();
    match err {
        OracleError::Exhausted { attempts, last_source, last } => {
            assert_eq!(attempts, 2);
            assert_eq!(last_source, "b");
            assert_eq!(last, SourceError::HttpStatus(404));
        }
        other => panic!("expected exhausted sources, got {other:?}"),
    }
    assert_eq!(contract.state(), &before);
}

#[tokio::test]
async fn test_empty_source_list_is_configuration_error() {
    let upstream = UpstreamMock::new().await;
    let config = mock_config(&upstream.url(), &[]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let err = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap_err();
    assert!(matches!(err, OracleError::Configuration(_)));
}
