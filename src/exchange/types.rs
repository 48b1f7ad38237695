//! Exchange WebSocket wire types
//!
//! Outbound subscription request and tagged decoding of inbound frames.
//! Frames are classified by shape, in this order:
//! `data.trades` (trade batch), `event == "error"` (error event),
//! `code == 1` (subscription ack); anything else is `Unrecognized`.

use crate::error::FeedError;
use crate::trades::types::{PairAllowList, Trade};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Timestamps below this magnitude are taken to be Unix seconds
const MILLIS_THRESHOLD: f64 = 1e12;

/// Subscription request sent right after connecting
///
/// Example JSON:
/// ```json
/// {
///   "id": 1,
///   "method": "subscribe",
///   "params": ["spot/trades:BTC_USDT", "spot/trades:ETH_USDT"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Request id, unique per connection attempt
    pub id: u64,

    /// Always "subscribe"
    pub method: String,

    /// Topic strings of the form `spot/trades:<PAIR>`
    pub params: Vec<String>,
}

impl SubscribeRequest {
    /// Trade-channel subscription for every allow-listed pair
    pub fn trades(id: u64, pairs: &PairAllowList) -> Self {
        Self {
            id,
            method: "subscribe".to_string(),
            params: pairs.trades_topics(),
        }
    }
}

/// One trade record inside a `data.trades` batch
///
/// Example JSON:
/// ```json
/// {
///   "symbol": "BTC-USDT",
///   "price": "16800.50",
///   "amount": "0.0125",
///   "side": "buy",
///   "timestamp": 1672531199999,
///   "trade_id": 774411
/// }
/// ```
/// Unknown fields (`trade_id` above) land in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTrade {
    /// Pair identifier as emitted by the exchange (may use `-`)
    #[serde(alias = "pair", alias = "market")]
    pub symbol: String,

    /// Price (string or number)
    #[serde(alias = "p")]
    pub price: Decimal,

    /// Quantity (string or number)
    #[serde(alias = "quantity", alias = "qty", alias = "q")]
    pub amount: Decimal,

    /// Taker side / trade type
    #[serde(alias = "type", alias = "taker_side")]
    pub side: String,

    /// Execution time normalized to Unix milliseconds
    #[serde(
        alias = "time",
        alias = "ts",
        alias = "t",
        deserialize_with = "deserialize_timestamp_ms"
    )]
    pub timestamp: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawTrade {
    /// Convert into a history record if the pair is allow-listed
    pub fn into_trade(self, pairs: &PairAllowList) -> Option<Trade> {
        let pair = pairs.resolve_exchange_symbol(&self.symbol)?.clone();
        Some(Trade {
            pair,
            price: self.price,
            quantity: self.amount,
            side: self.side,
            timestamp_ms: self.timestamp,
            extra: self.extra,
        })
    }
}

/// Decoded `data.trades` batch
#[derive(Debug, Clone, PartialEq)]
pub struct TradeBatch {
    /// Records that decoded cleanly, in frame order
    pub trades: Vec<RawTrade>,

    /// Records skipped because they failed to decode
    pub rejected: usize,
}

/// Exchange-reported error (`event == "error"`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorEvent {
    #[serde(default, alias = "errorCode")]
    pub code: Option<Value>,

    #[serde(default, alias = "msg", alias = "errorMessage")]
    pub message: Option<String>,
}

/// Subscription acknowledgement (`code == 1`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubscribeAck {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

/// Inbound frame after tagged decoding
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    TradeBatch(TradeBatch),
    ErrorEvent(ErrorEvent),
    SubscribeAck(SubscribeAck),
    Unrecognized(Value),
}

impl InboundFrame {
    /// Decode a text frame
    ///
    /// # Errors
    /// `FeedError::MalformedFrame` if the text is not JSON.
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FeedError::MalformedFrame(e.to_string()))?;
        Ok(Self::classify(value))
    }

    /// Classify an already-parsed JSON document
    pub fn classify(value: Value) -> Self {
        if let Some(records) = value.pointer("/data/trades").and_then(Value::as_array) {
            return InboundFrame::TradeBatch(decode_batch(records));
        }

        if value.get("event").and_then(Value::as_str) == Some("error") {
            let event = ErrorEvent::deserialize(&value).unwrap_or_else(|e| {
                warn!(error = %e, "Error event has unexpected field types");
                ErrorEvent::default()
            });
            return InboundFrame::ErrorEvent(event);
        }

        if value.get("code").and_then(Value::as_f64) == Some(1.0) {
            let ack = SubscribeAck::deserialize(&value).unwrap_or_default();
            return InboundFrame::SubscribeAck(ack);
        }

        InboundFrame::Unrecognized(value)
    }
}

fn decode_batch(records: &[Value]) -> TradeBatch {
    let mut trades = Vec::with_capacity(records.len());
    let mut rejected = 0;

    for record in records {
        match RawTrade::deserialize(record) {
            Ok(trade) => trades.push(trade),
            Err(e) => {
                warn!(error = %e, record = %record, "Skipping undecodable trade record");
                rejected += 1;
            }
        }
    }

    TradeBatch { trades, rejected }
}

/// Accept seconds or milliseconds, as a JSON number or numeric string
fn deserialize_timestamp_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    let millis = match &value {
        Value::Number(n) => match n.as_i64() {
            Some(int) => Some(int_to_millis(int)),
            None => n.as_f64().map(float_to_millis),
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(int) => Some(int_to_millis(int)),
                Err(_) => s.parse::<f64>().ok().map(float_to_millis),
            }
        }
        _ => None,
    };

    millis.ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value)))
}

fn int_to_millis(value: i64) -> i64 {
    if (value as f64).abs() < MILLIS_THRESHOLD {
        value.saturating_mul(1000)
    } else {
        value
    }
}

fn float_to_millis(value: f64) -> i64 {
    if value.abs() < MILLIS_THRESHOLD {
        (value * 1000.0).round() as i64
    } else {
        value.round() as i64
    }
}
