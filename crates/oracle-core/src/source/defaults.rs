//! Built-in public endpoints used when configuration does not override them.

use std::collections::BTreeMap;

use super::{Extractor, Source};

const BINANCE_HOSTS: [(&str, &str); 6] = [
    ("binance", "https://api.binance.com"),
    ("binance-gcp", "https://api-gcp.binance.com"),
    ("binance-1", "https://api1.binance.com"),
    ("binance-2", "https://api2.binance.com"),
    ("binance-3", "https://api3.binance.com"),
    ("binance-4", "https://api4.binance.com"),
];

pub const COINGECKO_KEY_HEADER: &str = "X-CG-Pro-API-Key";

/// Binance mirrors followed by CoinGecko.
#[must_use]
pub fn price_sources() -> Vec<Source> {
    let mut sources: Vec<Source> = BINANCE_HOSTS
        .iter()
        .map(|(name, host)| {
            Source::new(
                *name,
                format!("{host}/api/v3/ticker/price?symbol={{symbol}}USDT"),
                Extractor::JsonNumber { pointer: "/price".into(), label_pointer: None },
            )
        })
        .collect();
    sources.push(coingecko_source());
    sources
}

#[must_use]
pub fn coingecko_source() -> Source {
    Source::new(
        "coingecko",
        "https://api.coingecko.com/api/v3/simple/price?ids={coin_id}&vs_currencies=usd",
        Extractor::JsonNumber { pointer: "/{coin_id}/usd".into(), label_pointer: None },
    )
}

#[must_use]
pub fn weather_sources() -> Vec<Source> {
    vec![Source::new(
        "open-meteo",
        "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}&current_weather=true",
        Extractor::JsonNumber {
            pointer: "/current_weather/temperature".into(),
            label_pointer: Some("/current_weather/weathercode".into()),
        },
    )]
}

/// Reddit hot listing, then the CoinDesk RSS feed. Reddit answers 403 to
/// unauthenticated clients from some networks; that counts as no headlines.
#[must_use]
pub fn news_sources() -> Vec<Source> {
    vec![
        Source::new(
            "reddit",
            "https://www.reddit.com/r/CryptoCurrency/hot.json?limit={limit}&raw_json=1",
            Extractor::JsonArrayLen { pointer: "/data/children".into() },
        )
        .with_header("User-Agent", "Mozilla/5.0 (compatible; oracle-core/0.1)")
        .with_zero_on_status(403),
        Source::new(
            "coindesk-rss",
            "https://www.coindesk.com/arc/outboundfeeds/rss/",
            Extractor::TagCount { tag: "item".into(), cap_param: Some("limit".into()) },
        ),
    ]
}

/// Ticker to CoinGecko coin id. Keys are lowercase.
#[must_use]
pub fn coin_ids() -> BTreeMap<String, String> {
    [
        ("eth", "ethereum"),
        ("btc", "bitcoin"),
        ("sol", "solana"),
        ("matic", "matic-network"),
        ("avax", "avalanche-2"),
        ("ada", "cardano"),
        ("dot", "polkadot"),
        ("link", "chainlink"),
    ]
    .into_iter()
    .map(|(symbol, id)| (symbol.to_string(), id.to_string()))
    .collect()
}
