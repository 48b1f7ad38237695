//! Trade relay data structures
//!
//! Trading pairs, the static allow-list built at startup, and the normalized
//! trade records kept in the per-pair history.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::fmt;

/// Topic prefix used by the exchange for spot trade channels
const TRADES_TOPIC_PREFIX: &str = "spot/trades:";

/// Canonical trading pair identifier (uppercase, `_` separator, e.g. "BTC_USDT")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradingPair(String);

impl TradingPair {
    /// Normalize user-supplied pair text: trim, uppercase, `/` and `-` become `_`
    ///
    /// "btc/usdt" -> "BTC_USDT", " eth-usdt " -> "ETH_USDT"
    pub fn normalize(input: &str) -> String {
        input
            .trim()
            .to_uppercase()
            .chars()
            .map(|c| if c == '/' || c == '-' { '_' } else { c })
            .collect()
    }

    /// Parse and validate a pair from configuration or user input
    ///
    /// Returns `None` unless the normalized form is `BASE_QUOTE` with
    /// alphanumeric legs.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = Self::normalize(input);
        let mut legs = normalized.split('_');
        let valid = match (legs.next(), legs.next(), legs.next()) {
            (Some(base), Some(quote), None) => {
                !base.is_empty()
                    && !quote.is_empty()
                    && normalized
                        .chars()
                        .all(|c| c == '_' || c.is_ascii_alphanumeric())
            }
            _ => false,
        };

        valid.then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exchange subscription topic for this pair's trade channel
    pub fn trades_topic(&self) -> String {
        format!("{}{}", TRADES_TOPIC_PREFIX, self.0)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed set of pairs the relay subscribes to and answers queries for
///
/// Built once at startup, immutable afterward. Keeps configuration order
/// so replies list pairs the way the operator wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairAllowList {
    pairs: Vec<TradingPair>,
}

impl PairAllowList {
    /// Build an allow-list, dropping duplicates while preserving first occurrence
    pub fn new(pairs: impl IntoIterator<Item = TradingPair>) -> Self {
        let mut unique: Vec<TradingPair> = Vec::new();
        for pair in pairs {
            if !unique.contains(&pair) {
                unique.push(pair);
            }
        }
        Self { pairs: unique }
    }

    /// Resolve free-form user input ("btc/usdt") to an allow-listed pair
    pub fn resolve(&self, input: &str) -> Option<&TradingPair> {
        let normalized = TradingPair::normalize(input);
        self.pairs.iter().find(|p| p.as_str() == normalized)
    }

    /// Resolve a pair identifier as emitted by the exchange
    ///
    /// Only `-` is rewritten to `_`; anything else must already match the
    /// canonical form.
    pub fn resolve_exchange_symbol(&self, symbol: &str) -> Option<&TradingPair> {
        let canonical = symbol.replace('-', "_");
        self.pairs.iter().find(|p| p.as_str() == canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradingPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Subscription topics for every pair, in allow-list order
    pub fn trades_topics(&self) -> Vec<String> {
        self.pairs.iter().map(TradingPair::trades_topic).collect()
    }
}

impl Default for PairAllowList {
    fn default() -> Self {
        Self::new(
            ["BTC_USDT", "ETH_USDT"]
                .into_iter()
                .filter_map(TradingPair::parse),
        )
    }
}

impl fmt::Display for PairAllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.pairs.iter().map(TradingPair::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// One exchange-reported execution, as kept in the trade history
///
/// Created only by the feed connector and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Allow-listed pair this trade belongs to
    pub pair: TradingPair,

    /// Execution price (exact decimal, exchange precision preserved)
    pub price: Decimal,

    /// Executed quantity
    pub quantity: Decimal,

    /// Taker side as reported by the exchange ("buy", "sell", ...)
    pub side: String,

    /// Execution time (Unix milliseconds)
    pub timestamp_ms: i64,

    /// Every other field the exchange sent, passed through untouched
    pub extra: Map<String, Value>,
}
