//! Shared relay state: per-pair trade history and feed connection phase
//!
//! Single writer (the feed connector), many readers (command handlers). The
//! history lives behind one `RwLock` so append-then-trim is a single critical
//! section and readers never see a torn or over-capacity buffer.

use crate::trades::types::{PairAllowList, Trade, TradingPair};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Number of trades kept per pair (keep-last-N)
pub const TRADE_HISTORY_CAPACITY: usize = 10;

/// Bounded per-pair trade history
///
/// Keys are created from the allow-list at construction and never added
/// afterward, so a pair outside the allow-list can never appear.
pub struct TradeBuffer {
    capacity: usize,
    trades: RwLock<HashMap<TradingPair, VecDeque<Trade>>>,
}

impl TradeBuffer {
    /// Create an empty buffer with the default capacity of 10 per pair
    pub fn new(pairs: &PairAllowList) -> Self {
        Self::with_capacity(pairs, TRADE_HISTORY_CAPACITY)
    }

    pub fn with_capacity(pairs: &PairAllowList, capacity: usize) -> Self {
        let trades = pairs
            .iter()
            .map(|pair| (pair.clone(), VecDeque::with_capacity(capacity + 1)))
            .collect();

        Self {
            capacity,
            trades: RwLock::new(trades),
        }
    }

    /// Append trades in receipt order, trimming each touched pair to capacity
    ///
    /// Returns how many trades were stored. Trades for pairs that have no
    /// slot are dropped.
    pub async fn extend(&self, batch: impl IntoIterator<Item = Trade>) -> usize {
        let mut trades = self.trades.write().await;
        let mut stored = 0;

        for trade in batch {
            let Some(history) = trades.get_mut(&trade.pair) else {
                debug!(pair = %trade.pair, "Dropping trade for pair without history slot");
                continue;
            };

            history.push_back(trade);
            while history.len() > self.capacity {
                history.pop_front();
            }
            stored += 1;
        }

        stored
    }

    /// Append a single trade; `false` if the pair has no history slot
    pub async fn push(&self, trade: Trade) -> bool {
        self.extend(std::iter::once(trade)).await == 1
    }

    /// Most recent `limit` trades for a pair, oldest first (most recent last)
    pub async fn recent(&self, pair: &TradingPair, limit: usize) -> Vec<Trade> {
        let trades = self.trades.read().await;
        match trades.get(pair) {
            Some(history) => {
                let skip = history.len().saturating_sub(limit);
                history.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Full history for a pair, oldest first
    pub async fn snapshot(&self, pair: &TradingPair) -> Vec<Trade> {
        self.recent(pair, self.capacity).await
    }

    pub async fn len(&self, pair: &TradingPair) -> usize {
        self.trades.read().await.get(pair).map_or(0, VecDeque::len)
    }

    pub async fn is_empty(&self, pair: &TradingPair) -> bool {
        self.len(pair).await == 0
    }

    /// Pairs that own a history slot
    pub async fn pairs(&self) -> Vec<TradingPair> {
        let mut pairs: Vec<TradingPair> = self.trades.read().await.keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

/// Feed connector lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeedPhase {
    Disconnected = 0,
    Connecting = 1,
    Subscribed = 2,
}

impl FeedPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => FeedPhase::Connecting,
            2 => FeedPhase::Subscribed,
            _ => FeedPhase::Disconnected,
        }
    }
}

/// Process-wide relay state shared between the feed connector and command handlers
pub struct RelayState {
    buffer: TradeBuffer,
    phase: AtomicU8,
}

impl RelayState {
    pub fn new(pairs: &PairAllowList) -> Self {
        Self::with_buffer(TradeBuffer::new(pairs))
    }

    pub fn with_buffer(buffer: TradeBuffer) -> Self {
        Self {
            buffer,
            phase: AtomicU8::new(FeedPhase::Disconnected as u8),
        }
    }

    pub fn buffer(&self) -> &TradeBuffer {
        &self.buffer
    }

    pub fn phase(&self) -> FeedPhase {
        FeedPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Connection liveness as seen by queries: true only while subscribed
    pub fn is_connected(&self) -> bool {
        self.phase() == FeedPhase::Subscribed
    }

    /// Owned by the feed connector
    pub(crate) fn set_phase(&self, phase: FeedPhase) {
        let previous = FeedPhase::from_u8(self.phase.swap(phase as u8, Ordering::AcqRel));
        if previous != phase {
            debug!(from = ?previous, to = ?phase, "Feed phase changed");
        }
    }
}
