//! Live trade history for the relay bot
//!
//! - Static pair allow-list and normalized trade records
//! - Bounded keep-last-10 history per pair, shared with the feed connector
//! - Recent-trades query handler and its plain-text rendering

pub mod buffer;
pub mod formatter;
pub mod tools;
pub mod types;

pub use buffer::{FeedPhase, RelayState, TradeBuffer, TRADE_HISTORY_CAPACITY};
pub use tools::{get_recent_trades, TradesReply, RECENT_TRADES_SHOWN};
pub use types::{PairAllowList, Trade, TradingPair};
