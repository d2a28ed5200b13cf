//! API key rotation against a keyed mock endpoint.

use oracle_core::{state::PersistentState, OracleContract, OracleError, PriceFlavor};

use crate::mock_infrastructure::{encoded_key, mock_config, UpstreamMock, KEY_HEADER};

const KEYED_PATH: &str = "/keyed/price/ETH";

async fn contract_with_keys(upstream: &UpstreamMock, raw_keys: &[&str]) -> OracleContract {
    let config = mock_config(&upstream.url(), &[]);
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();
    for key in raw_keys {
        contract.add_credential(&encoded_key(key)).unwrap();
    }
    contract
}

#[tokio::test]
async fn test_rejected_key_rotates_to_next() {
    let mut upstream = UpstreamMock::new().await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k0", 401, "0").await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k1", 200, "3100").await;

    let mut contract = contract_with_keys(&upstream, &["k0", "k1", "k2"]).await;
    contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap();

    let view = contract.price();
    assert!((view.price - 3100.0).abs() < f64::EPSILON);
    assert_eq!(view.source, "keyed-key-1");

    let keys = contract.key_status();
    assert_eq!(keys.key_count, 3);
    assert_eq!(keys.active_index, 1);
    assert_eq!(keys.success_counts.get(&0), Some(&0));
    assert_eq!(keys.success_counts.get(&1), Some(&1));
    assert_eq!(keys.success_counts.get(&2), Some(&0));
}

#[tokio::test]
async fn test_next_round_starts_from_active_key() {
    let mut upstream = UpstreamMock::new().await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k0", 429, "0").await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k1", 200, "3100").await;

    let mut contract = contract_with_keys(&upstream, &["k0", "k1"]).await;
    contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap();
    contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap();

    let keys = contract.key_status();
    assert_eq!(keys.active_index, 1);
    assert_eq!(keys.success_counts.get(&1), Some(&2));
    assert_eq!(keys.success_counts.get(&0), Some(&0));
}

#[tokio::test]
async fn test_every_key_failing_exhausts_without_bookkeeping() {
    let mut upstream = UpstreamMock::new().await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k0", 401, "0").await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k1", 403, "0").await;

    let mut contract = contract_with_keys(&upstream, &["k0", "k1"]).await;
    let err = contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap_err();

    assert!(matches!(err, OracleError::Exhausted { attempts: 2, .. }));
    let keys = contract.key_status();
    assert_eq!(keys.active_index, 0);
    assert!(keys.success_counts.values().all(|count| *count == 0));
}

#[tokio::test]
async fn test_no_keys_fails_fast_without_requests() {
    let mut upstream = UpstreamMock::new().await;
    upstream.never(KEYED_PATH).await;

    let mut contract = contract_with_keys(&upstream, &[]).await;
    let err = contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap_err();

    assert!(matches!(err, OracleError::Configuration(_)));
    upstream.verify().await;
}

#[tokio::test]
async fn test_manual_rotation_changes_first_key_tried() {
    let mut upstream = UpstreamMock::new().await;
    upstream.keyed_price(KEYED_PATH, KEY_HEADER, "k1", 200, "3200").await;

    let mut contract = contract_with_keys(&upstream, &["k0", "k1"]).await;
    assert_eq!(contract.rotate().unwrap(), 1);

    contract.update_price(PriceFlavor::RotatingKey, "ETH").await.unwrap();
    assert_eq!(contract.price().source, "keyed-key-1");
}

#[test]
fn test_blank_key_is_rejected() {
    let config = oracle_core::config::AppConfig::default();
    let mut contract = OracleContract::with_http(&config, PersistentState::default()).unwrap();
    assert!(contract.add_credential("   ").is_err());
    assert_eq!(contract.key_status().key_count, 0);
}
