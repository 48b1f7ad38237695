//! Recent-trades query handler
//!
//! Validates a requested pair against the allow-list, checks feed liveness and
//! renders the latest buffered trades. Never mutates the buffer.

use crate::trades::buffer::RelayState;
use crate::trades::formatter::format_trade_line;
use crate::trades::types::{PairAllowList, Trade, TradingPair};
use std::fmt;

/// Number of most recent trades included in a reply
pub const RECENT_TRADES_SHOWN: usize = 3;

/// Outcome of a recent-trades query
#[derive(Debug, Clone, PartialEq)]
pub enum TradesReply {
    /// Requested pair is not in the allow-list
    UnsupportedPair {
        requested: String,
        supported: PairAllowList,
    },

    /// Feed is not subscribed; buffered data may be stale and is not shown
    NotConnected,

    /// Pair is supported and the feed is live, but nothing arrived yet
    NoData(TradingPair),

    /// Up to three most recent trades, most recent last
    Recent {
        pair: TradingPair,
        trades: Vec<Trade>,
    },
}

impl fmt::Display for TradesReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradesReply::UnsupportedPair {
                requested,
                supported,
            } => write!(
                f,
                "Pair '{}' is not supported. Available pairs: {}",
                requested.trim(),
                supported
            ),
            TradesReply::NotConnected => f.write_str(
                "Trade data is unavailable: not connected to the exchange. Try again shortly.",
            ),
            TradesReply::NoData(pair) => write!(f, "No trades received for {} yet.", pair),
            TradesReply::Recent { pair, trades } => {
                write!(f, "Last {} trades for {}:", trades.len(), pair)?;
                for trade in trades {
                    write!(f, "\n{}", format_trade_line(trade))?;
                }
                Ok(())
            }
        }
    }
}

/// Answer a recent-trades request for free-form pair text
///
/// Order of checks: allow-list, then connection state, then buffer contents.
pub async fn get_recent_trades(
    requested: &str,
    pairs: &PairAllowList,
    state: &RelayState,
) -> TradesReply {
    let Some(pair) = pairs.resolve(requested) else {
        return TradesReply::UnsupportedPair {
            requested: requested.to_string(),
            supported: pairs.clone(),
        };
    };

    if !state.is_connected() {
        return TradesReply::NotConnected;
    }

    let trades = state.buffer().recent(pair, RECENT_TRADES_SHOWN).await;
    if trades.is_empty() {
        return TradesReply::NoData(pair.clone());
    }

    TradesReply::Recent {
        pair: pair.clone(),
        trades,
    }
}
