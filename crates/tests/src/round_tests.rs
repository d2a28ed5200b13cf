//! Whole-round properties: idempotence, persistence and failure atomicity.

use oracle_core::{
    consensus::RoundPhase,
    state::{JsonFileStore, PersistentState, StateStore},
    OracleContract, OracleError, PriceFlavor,
};

use crate::mock_infrastructure::{encoded_key, mock_config, UpstreamMock, KEY_HEADER};

#[tokio::test]
async fn test_repeated_round_with_same_data_is_idempotent() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "ETH", "3000").await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let first = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();
    let after_first = contract.state().clone();
    let second = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();

    assert_eq!(contract.state(), &after_first);
    assert_eq!(first.commit, second.commit);
    assert!(second.round > first.round);
}

#[tokio::test]
async fn test_every_validator_votes() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "ETH", "3000").await;

    let mut config = mock_config(&upstream.url(), &["a"]);
    config.consensus.validators = 7;
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let report = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();
    assert_eq!(report.decision.total, 7);
    assert_eq!(report.decision.accepted, 7);
    assert_eq!(report.decision.required, 7);
}

#[tokio::test]
async fn test_fractional_quorum_threshold() {
    let mut upstream = UpstreamMock::new().await;
    upstream.price("a", "ETH", "3000").await;

    let mut config = mock_config(&upstream.url(), &["a"]);
    config.consensus.validators = 5;
    config.consensus.quorum_threshold = 0.6;
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let report = contract.update_price(PriceFlavor::PriceFeed, "ETH").await.unwrap();
    assert_eq!(report.decision.required, 3);
    assert_eq!(report.phase, RoundPhase::Committed);
}

#[tokio::test]
async fn test_invalid_symbol_makes_no_request() {
    let mut upstream = UpstreamMock::new().await;
    upstream.never("/a/price/ETH").await;

    let config = mock_config(&upstream.url(), &["a"]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();

    let err = contract.update_price(PriceFlavor::PriceFeed, "ETH/USD").await.unwrap_err();
    assert!(matches!(err, OracleError::Configuration(_)));
    upstream.verify().await;
}

#[tokio::test]
async fn test_state_survives_save_and_reload() {
    let mut upstream = UpstreamMock::new().await;
    upstream.keyed_price("/keyed/price/ETH", KEY_HEADER, "k0", 401, "0").await;
    upstream.keyed_price("/keyed/price/ETH", KEY_HEADER, "k1", 200, "3050").await;

    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("state.json"));
    let config = mock_config(&upstream.url(), &[]);

    let mut contract = OracleContract::with_http(&config, store.load().await.unwrap()).unwrap();
    contract.add_credential(&encoded_key("k0")).unwrap();
    contract.add_credential(&encoded_key("k1")).unwrap();
    contract.set_proxy_url("http://proxy.example/api/").unwrap();
    contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap();
    store.save(contract.state()).await.unwrap();

    let reloaded = store.load().await.unwrap();
    assert_eq!(&reloaded, contract.state());
    assert_eq!(reloaded.proxy_url, "http://proxy.example/api");
    assert_eq!(reloaded.rotation.active_index(), 1);
    assert_eq!(reloaded.rotation.success_count(1), 1);
    assert_eq!(reloaded.source, "keyed-key-1");
}

#[tokio::test]
async fn test_missing_state_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("never-written.json"));

    let state = store.load().await.unwrap();
    assert_eq!(state, PersistentState::default());
    assert!(state.rotation.is_empty());
}
