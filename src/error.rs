use thiserror::Error;

/// Faults raised while talking to the exchange WebSocket
///
/// Only transport faults end a session; a malformed frame is contained at the
/// point of detection and the read loop continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Subscription request failed: {0}")]
    Subscribe(String),

    #[error("Connection closed by exchange: {0}")]
    Closed(String),

    #[error("Stream ended without a close frame")]
    StreamEnded,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

impl FeedError {
    /// Whether this fault tears down the current session and triggers a reconnect
    pub fn is_transport_fault(&self) -> bool {
        !matches!(self, FeedError::MalformedFrame(_))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            FeedError::Connect(_) => "connect",
            FeedError::Subscribe(_) => "subscribe",
            FeedError::Closed(_) => "closed",
            FeedError::StreamEnded => "stream_ended",
            FeedError::Protocol(_) => "protocol",
            FeedError::MalformedFrame(_) => "malformed_frame",
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                FeedError::Closed(err.to_string())
            }
            other => FeedError::Protocol(other.to_string()),
        }
    }
}

/// Operator notification could not be delivered
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Startup configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
