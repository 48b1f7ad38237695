//! Relay Bot Configuration
//!
//! Loaded once at startup, immutable afterward.

use crate::config::credentials::SecretString;
use crate::error::ConfigError;
use crate::trades::types::{PairAllowList, TradingPair};
use std::time::Duration;

/// Default reconnect delay in seconds
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Relay bot configuration
///
/// ## Environment Variables
///
/// - `BOT_TOKEN`: Telegram bot token (required)
/// - `EXCHANGE_WS_URL`: exchange WebSocket endpoint, `ws://` or `wss://` (required)
/// - `OPERATOR_CHAT_ID`: chat receiving connect/disconnect notifications (optional;
///   notifications are only logged when unset)
/// - `TRADE_PAIRS`: comma-separated allow-list (default: BTC_USDT,ETH_USDT)
/// - `RECONNECT_DELAY_SECS`: fixed delay between reconnect attempts (default: 5)
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bot_token: SecretString,
    pub ws_url: String,
    pub operator_chat_id: Option<i64>,
    pub pairs: PairAllowList,
    pub reconnect_delay: Duration,
}

impl RelayConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Values are trimmed; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN")
            .map(SecretString::new)
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let ws_url = get("EXCHANGE_WS_URL").ok_or(ConfigError::Missing("EXCHANGE_WS_URL"))?;
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError::Invalid {
                name: "EXCHANGE_WS_URL",
                reason: format!("expected a ws:// or wss:// URL, got '{}'", ws_url),
            });
        }

        let operator_chat_id = get("OPERATOR_CHAT_ID")
            .map(|raw| {
                raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
                    name: "OPERATOR_CHAT_ID",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let pairs = match get("TRADE_PAIRS") {
            Some(raw) => parse_pairs(&raw)?,
            None => PairAllowList::default(),
        };

        let reconnect_delay_secs = match get("RECONNECT_DELAY_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "RECONNECT_DELAY_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_RECONNECT_DELAY_SECS,
        };
        if reconnect_delay_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "RECONNECT_DELAY_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bot_token,
            ws_url,
            operator_chat_id,
            pairs,
            reconnect_delay: Duration::from_secs(reconnect_delay_secs),
        })
    }
}

fn parse_pairs(raw: &str) -> Result<PairAllowList, ConfigError> {
    let mut pairs = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let pair = TradingPair::parse(item).ok_or_else(|| ConfigError::Invalid {
            name: "TRADE_PAIRS",
            reason: format!("'{}' is not a BASE_QUOTE pair", item),
        })?;
        pairs.push(pair);
    }

    let allow_list = PairAllowList::new(pairs);
    if allow_list.is_empty() {
        return Err(ConfigError::Invalid {
            name: "TRADE_PAIRS",
            reason: "at least one pair is required".to_string(),
        });
    }
    Ok(allow_list)
}
