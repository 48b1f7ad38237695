//! Exchange WebSocket integration
//!
//! This module contains the wire types and the long-running feed connector.

pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use types::{ErrorEvent, InboundFrame, RawTrade, SubscribeAck, SubscribeRequest, TradeBatch};
pub use websocket::{FeedConnector, FrameOutcome, DEFAULT_RECONNECT_DELAY};
