//! Exchange trade feed connector
//!
//! Keeps one WebSocket session to the exchange alive forever:
//! 1. Connects (`Connecting`) and sends the trade-channel subscription
//! 2. Enters `Subscribed`, decoding frames into the shared trade history
//! 3. On close, stream end or protocol error drops back to `Disconnected`,
//!    notifies the operator, sleeps a fixed delay and starts over
//!
//! Backoff is fixed rather than exponential: one host, one logical subscription.

use crate::bot::notifier::Notifier;
use crate::error::FeedError;
use crate::exchange::types::{InboundFrame, SubscribeRequest};
use crate::trades::buffer::{FeedPhase, RelayState};
use crate::trades::types::{PairAllowList, Trade};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

/// Default delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// What the connector did with one text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Trade batch applied; `dropped` counts off-list pairs and bad records
    Stored { stored: usize, dropped: usize },

    /// Exchange reported an error; session continues
    ExchangeError,

    /// Subscription confirmed
    Acknowledged,

    /// Valid JSON of an unknown shape
    Ignored,

    /// Not JSON; frame discarded
    Malformed,
}

/// Background WebSocket client feeding the shared trade history
pub struct FeedConnector {
    url: String,
    pairs: Arc<PairAllowList>,
    state: Arc<RelayState>,
    notifier: Arc<dyn Notifier>,
    reconnect_delay: Duration,
    next_request_id: AtomicU64,
}

impl FeedConnector {
    /// Create a connector for the given endpoint with the default 5s delay
    pub fn new(
        url: impl Into<String>,
        pairs: Arc<PairAllowList>,
        state: Arc<RelayState>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            url: url.into(),
            pairs,
            state,
            notifier,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run the connect/subscribe/read cycle forever
    ///
    /// Never returns; stop it by aborting the task that runs it.
    pub async fn run(&self) {
        loop {
            let fault = self.run_session().await;
            self.state.set_phase(FeedPhase::Disconnected);

            warn!(
                url = %self.url,
                error = %fault,
                kind = fault.error_type(),
                retry_delay_secs = self.reconnect_delay.as_secs_f64(),
                "Trade feed disconnected, reconnecting..."
            );
            self.notify(&format!(
                "Trade feed disconnected: {}. Reconnecting in {}s.",
                fault,
                self.reconnect_delay.as_secs_f64()
            ))
            .await;

            sleep(self.reconnect_delay).await;
        }
    }

    /// One session: connect, subscribe, read until a transport fault
    ///
    /// Always ends with the fault that closed the session.
    async fn run_session(&self) -> FeedError {
        self.state.set_phase(FeedPhase::Connecting);
        info!(url = %self.url, "Connecting to exchange WebSocket...");

        let ws_stream = match connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => return FeedError::Connect(e.to_string()),
        };
        info!(url = %self.url, "WebSocket connected successfully");

        let (write, read) = ws_stream.split();
        self.drive(write, read).await
    }

    /// Subscribe over an open connection, then read until a transport fault
    ///
    /// A failed subscription send notifies the operator and ends the session
    /// without ever entering `Subscribed`.
    pub async fn drive<W, R>(&self, mut write: W, read: R) -> FeedError
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let request = SubscribeRequest::trades(self.next_request_id(), &self.pairs);
        if let Err(fault) = self.subscribe(&mut write, &request).await {
            error!(error = %fault, "Failed to send subscription request");
            self.notify(&format!("Trade feed subscription failed: {}", fault))
                .await;
            return fault;
        }

        self.state.set_phase(FeedPhase::Subscribed);
        info!(
            request_id = request.id,
            topics = ?request.params,
            "Subscribed to trade channels"
        );
        self.notify(&format!(
            "Trade feed connected, subscribed to {}",
            self.pairs
        ))
        .await;

        // The write half stays alive for the whole session; tungstenite flushes
        // queued pong replies while reading.
        let fault = self.consume(read).await;
        drop(write);
        fault
    }

    /// Send the subscription handshake over the write half
    pub async fn subscribe<S>(&self, write: &mut S, request: &SubscribeRequest) -> Result<(), FeedError>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let payload =
            serde_json::to_string(request).map_err(|e| FeedError::Subscribe(e.to_string()))?;
        debug!(payload = %payload, "Sending subscription request");

        write
            .send(Message::text(payload))
            .await
            .map_err(|e| FeedError::Subscribe(e.to_string()))
    }

    /// Read frames until the session ends, applying each one to the history
    ///
    /// Returns the transport fault that ended the stream. Malformed and
    /// unrecognized frames never end it.
    pub async fn consume<S>(&self, mut read: S) -> FeedError
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    self.handle_text(&text).await;
                }
                Ok(Message::Binary(data)) => {
                    debug!(bytes = data.len(), "Ignoring binary frame");
                }
                Ok(Message::Ping(data)) => {
                    debug!(bytes = data.len(), "Received ping");
                }
                Ok(Message::Pong(_)) => {
                    debug!("Received pong");
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "WebSocket close frame received");
                    let reason = match frame {
                        Some(frame) => format!(
                            "code {} {}",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        )
                        .trim_end()
                        .to_string(),
                        None => "no close reason".to_string(),
                    };
                    return FeedError::Closed(reason);
                }
                Ok(Message::Frame(_)) => {
                    // Raw frames are handled internally by tungstenite
                }
                Err(e) => {
                    error!(error = %e, "WebSocket error");
                    return FeedError::from(e);
                }
            }
        }

        FeedError::StreamEnded
    }

    /// Decode one text frame and apply it
    pub async fn handle_text(&self, text: &str) -> FrameOutcome {
        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, text = %text, "Discarding malformed frame");
                return FrameOutcome::Malformed;
            }
        };

        match frame {
            InboundFrame::TradeBatch(batch) => {
                let received = batch.trades.len();
                let trades: Vec<Trade> = batch
                    .trades
                    .into_iter()
                    .filter_map(|raw| raw.into_trade(&self.pairs))
                    .inspect(|trade| {
                        debug!(
                            pair = %trade.pair,
                            price = %trade.price,
                            quantity = %trade.quantity,
                            side = %trade.side,
                            "Received trade"
                        );
                    })
                    .collect();

                let stored = self.state.buffer().extend(trades).await;
                let dropped = batch.rejected + (received - stored);

                if dropped > 0 {
                    debug!(stored, dropped, "Trade batch partially applied");
                }
                FrameOutcome::Stored { stored, dropped }
            }
            InboundFrame::ErrorEvent(event) => {
                let message = event.message.as_deref().unwrap_or("no message");
                error!(code = ?event.code, reason = message, "Exchange reported an error");

                let text = match &event.code {
                    Some(code) => format!("Exchange error (code {}): {}", code, message),
                    None => format!("Exchange error: {}", message),
                };
                self.notify(&text).await;
                FrameOutcome::ExchangeError
            }
            InboundFrame::SubscribeAck(ack) => {
                info!(
                    request_id = ?ack.id,
                    reason = ack.message.as_deref().unwrap_or("<none>"),
                    "Subscription confirmed by exchange"
                );
                FrameOutcome::Acknowledged
            }
            InboundFrame::Unrecognized(value) => {
                debug!(frame = %value, "Ignoring unrecognized frame");
                FrameOutcome::Ignored
            }
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Best-effort operator notification; failures are logged and swallowed
    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            warn!(error = %e, "Failed to deliver operator notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::notifier::tests::RecordingNotifier;
    use crate::trades::types::TradingPair;
    use futures::stream;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    fn connector_at(url: &str, notifier: Arc<RecordingNotifier>) -> FeedConnector {
        let pairs = Arc::new(PairAllowList::default());
        let state = Arc::new(RelayState::new(&pairs));
        FeedConnector::new(url, pairs, state, notifier)
    }

    fn connector(notifier: Arc<RecordingNotifier>) -> FeedConnector {
        connector_at("ws://127.0.0.1:9", notifier)
    }

    fn batch(symbol: &str, first: i64, count: i64) -> String {
        let trades: Vec<String> = (first..first + count)
            .map(|i| {
                format!(
                    r#"{{"symbol": "{}", "price": "{}.5", "amount": "0.01", "side": "buy", "timestamp": {}}}"#,
                    symbol,
                    100 + i,
                    1_672_531_200_000 + i
                )
            })
            .collect();
        format!(r#"{{"data": {{"trades": [{}]}}}}"#, trades.join(","))
    }

    fn btc() -> TradingPair {
        TradingPair::parse("BTC_USDT").unwrap()
    }

    #[tokio::test]
    async fn test_twelve_trades_keep_last_ten() {
        let feed = connector(Arc::new(RecordingNotifier::default()));

        let outcome = feed.handle_text(&batch("BTC-USDT", 0, 12)).await;
        assert_eq!(outcome, FrameOutcome::Stored { stored: 12, dropped: 0 });

        let history = feed.state.buffer().snapshot(&btc()).await;
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].timestamp_ms, 1_672_531_200_002);
        assert_eq!(history[9].timestamp_ms, 1_672_531_200_011);
    }

    #[tokio::test]
    async fn test_off_list_pairs_are_dropped() {
        let feed = connector(Arc::new(RecordingNotifier::default()));

        let outcome = feed.handle_text(&batch("DOGE-USDT", 0, 3)).await;
        assert_eq!(outcome, FrameOutcome::Stored { stored: 0, dropped: 3 });
        assert_eq!(feed.state.buffer().pairs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_frame_classification_outcomes() {
        let feed = connector(Arc::new(RecordingNotifier::default()));

        assert_eq!(
            feed.handle_text(r#"{"event": "error", "msg": "denied"}"#).await,
            FrameOutcome::ExchangeError
        );
        assert_eq!(
            feed.handle_text(r#"{"id": 1, "code": 1}"#).await,
            FrameOutcome::Acknowledged
        );
        assert_eq!(feed.handle_text(r#"{"ping": 1}"#).await, FrameOutcome::Ignored);
        assert_eq!(feed.handle_text("<html>").await, FrameOutcome::Malformed);
    }

    #[tokio::test]
    async fn test_malformed_frame_between_batches() {
        let feed = connector(Arc::new(RecordingNotifier::default()));
        let frames = vec![
            Ok(Message::text(batch("BTC-USDT", 0, 2))),
            Ok(Message::text("{\"data\": {\"trades\": [")),
            Ok(Message::text(batch("BTC-USDT", 2, 2))),
        ];

        let fault = feed.consume(stream::iter(frames)).await;
        assert_eq!(fault, FeedError::StreamEnded);

        let stamps: Vec<i64> = feed
            .state
            .buffer()
            .snapshot(&btc())
            .await
            .iter()
            .map(|t| t.timestamp_ms - 1_672_531_200_000)
            .collect();
        assert_eq!(stamps, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_frame_ends_session() {
        let feed = connector(Arc::new(RecordingNotifier::default()));
        let frames = vec![
            Ok(Message::text(batch("ETH-USDT", 0, 1))),
            Ok(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "idle".into(),
            }))),
            Ok(Message::text(batch("ETH-USDT", 1, 1))),
        ];

        let fault = feed.consume(stream::iter(frames)).await;
        assert_eq!(fault, FeedError::Closed("code 1001 idle".to_string()));

        let eth = TradingPair::parse("ETH_USDT").unwrap();
        assert_eq!(feed.state.buffer().len(&eth).await, 1);
    }

    #[tokio::test]
    async fn test_protocol_error_ends_session() {
        let feed = connector(Arc::new(RecordingNotifier::default()));
        let frames = vec![
            Ok(Message::Ping(Vec::new().into())),
            Err(tungstenite::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ];

        let fault = feed.consume(stream::iter(frames)).await;
        assert!(fault.is_transport_fault());
        assert_eq!(fault.error_type(), "protocol");
    }

    #[tokio::test]
    async fn test_subscribe_sends_request() {
        let feed = connector(Arc::new(RecordingNotifier::default()));
        let (tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = tx.sink_map_err(|_| tungstenite::Error::AlreadyClosed);

        let request = SubscribeRequest::trades(feed.next_request_id(), &feed.pairs);
        feed.subscribe(&mut sink, &request).await.unwrap();
        drop(sink);

        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(sent.len(), 1);
        let body: SubscribeRequest = serde_json::from_str(sent[0].to_text().unwrap()).unwrap();
        assert_eq!(body.id, 1);
        assert_eq!(body.method, "subscribe");
        assert_eq!(body.params, vec!["spot/trades:BTC_USDT", "spot/trades:ETH_USDT"]);
        assert_eq!(feed.next_request_id(), 2);
    }

    #[tokio::test]
    async fn test_failed_subscription_send_ends_session() {
        let notifier = Arc::new(RecordingNotifier::default());
        let feed = connector(notifier.clone());

        let (tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        drop(rx);
        let sink = tx.sink_map_err(|e| tungstenite::Error::Io(std::io::Error::other(e)));
        let frames = stream::iter(vec![Ok(Message::text(batch("BTC-USDT", 0, 1)))]);

        let fault = feed.drive(sink, frames).await;

        assert_eq!(fault.error_type(), "subscribe");
        assert!(fault.is_transport_fault());
        assert!(!feed.state.is_connected());
        assert!(feed.state.buffer().is_empty(&btc()).await);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Trade feed subscription failed"));
    }

    #[tokio::test]
    async fn test_drive_subscribes_then_consumes() {
        let notifier = Arc::new(RecordingNotifier::default());
        let feed = connector(notifier.clone());

        let (tx, rx) = futures::channel::mpsc::unbounded::<Message>();
        let sink = tx.sink_map_err(|_| tungstenite::Error::AlreadyClosed);
        let frames = stream::iter(vec![Ok(Message::text(batch("BTC-USDT", 0, 2)))]);

        let fault = feed.drive(sink, frames).await;

        assert_eq!(fault, FeedError::StreamEnded);
        assert!(feed.state.is_connected());
        assert_eq!(feed.state.buffer().len(&btc()).await, 2);

        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            notifier.messages(),
            vec!["Trade feed connected, subscribed to BTC_USDT, ETH_USDT"]
        );
    }

    #[tokio::test]
    async fn test_exchange_error_notifies_and_session_continues() {
        let notifier = Arc::new(RecordingNotifier::default());
        let feed = connector(notifier.clone());
        let frames = vec![
            Ok(Message::text(
                r#"{"event": "error", "code": 10003, "msg": "invalid topic"}"#,
            )),
            Ok(Message::text(r#"{"event": "error"}"#)),
            Ok(Message::text(batch("BTC-USDT", 0, 1))),
        ];

        let fault = feed.consume(stream::iter(frames)).await;

        assert_eq!(fault, FeedError::StreamEnded);
        assert_eq!(feed.state.buffer().len(&btc()).await, 1);
        assert_eq!(
            notifier.messages(),
            vec![
                "Exchange error (code 10003): invalid topic",
                "Exchange error: no message",
            ]
        );
    }

    #[tokio::test]
    async fn test_exchange_error_notification_failure_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let feed = connector(notifier.clone());

        let outcome = feed
            .handle_text(r#"{"event": "error", "msg": "denied"}"#)
            .await;

        assert_eq!(outcome, FrameOutcome::ExchangeError);
        assert_eq!(notifier.messages(), vec!["Exchange error: denied"]);
    }

    #[tokio::test]
    async fn test_connect_failure_notifies_and_retries() {
        // Bind then release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // Delivery failures must not stop the retry loop
        let notifier = Arc::new(RecordingNotifier::failing());
        let feed = Arc::new(
            connector_at(&format!("ws://{}", addr), notifier.clone())
                .with_reconnect_delay(Duration::from_millis(20)),
        );

        let runner = feed.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        let waited = tokio::time::timeout(Duration::from_secs(10), async {
            while notifier.messages().len() < 2 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        handle.abort();

        assert!(waited.is_ok(), "connector did not retry: {:?}", notifier.messages());
        let messages = notifier.messages();
        assert!(messages[0].starts_with("Trade feed disconnected: Connection failed"));
        assert!(messages[1].starts_with("Trade feed disconnected: Connection failed"));
        assert!(!feed.state.is_connected());
    }
}
