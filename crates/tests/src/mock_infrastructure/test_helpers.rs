//! Configuration and payload helpers.

use oracle_core::{
    config::AppConfig,
    source::{CredentialEncoding, Extractor, HttpClientConfig, Source},
};

/// Header the keyed test source reads its credential from.
pub const KEY_HEADER: &str = "X-Api-Key";

/// Config whose every source points at `base`, with retries off so each
/// failing source is hit exactly once.
///
/// Price sources are `{base}/{name}/price/{symbol}`, the keyed source is
/// `{base}/keyed/price/{symbol}`, weather is `{base}/weather/{lat}/{lon}` and
/// news is `{base}/news/listing` then `{base}/news/rss`.
#[must_use]
pub fn mock_config(base: &str, price_sources: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.http = HttpClientConfig { max_retries: 0, call_timeout_seconds: 5, ..HttpClientConfig::default() };
    config.consensus.validators = 3;

    config.sources.price = price_sources.iter().map(|name| price_source(base, name)).collect();

    config.sources.rotation.source = price_source(base, "keyed");
    config.sources.rotation.header = KEY_HEADER.to_string();
    config.sources.rotation.encoding = CredentialEncoding::Base64;

    config.sources.weather = vec![Source::new(
        "weather",
        format!("{base}/weather/{{lat}}/{{lon}}"),
        Extractor::JsonNumber {
            pointer: "/current_weather/temperature".into(),
            label_pointer: Some("/current_weather/weathercode".into()),
        },
    )];

    config.sources.news = vec![
        Source::new(
            "listing",
            format!("{base}/news/listing"),
            Extractor::JsonArrayLen { pointer: "/data/children".into() },
        )
        .with_zero_on_status(403),
        Source::new(
            "rss",
            format!("{base}/news/rss"),
            Extractor::TagCount { tag: "item".into(), cap_param: Some("limit".into()) },
        ),
    ];

    config
}

#[must_use]
pub fn price_source(base: &str, name: &str) -> Source {
    Source::new(
        name,
        format!("{base}/{name}/price/{{symbol}}"),
        Extractor::JsonNumber { pointer: "/price".into(), label_pointer: None },
    )
}

/// Base64 form of a raw test credential, as the contract stores it.
#[must_use]
pub fn encoded_key(raw: &str) -> String {
    CredentialEncoding::Base64.encode(raw)
}

/// Listing body with `n` children.
#[must_use]
pub fn listing_body(n: usize) -> serde_json::Value {
    let children: Vec<_> = (0..n).map(|i| serde_json::json!({ "id": i })).collect();
    serde_json::json!({ "data": { "children": children } })
}

/// RSS body with `n` items.
#[must_use]
pub fn rss_body(n: usize) -> String {
    let items: String = (0..n).map(|i| format!("<item><title>h{i}</title></item>")).collect();
    format!("<rss><channel>{items}</channel></rss>")
}
