//! Inbound bot commands
//!
//! Parses chat text into [`BotCommand`] and produces the reply text. Nothing
//! here depends on the messaging transport.

use crate::trades::buffer::RelayState;
use crate::trades::tools::{get_recent_trades, RECENT_TRADES_SHOWN};
use crate::trades::types::PairAllowList;
use std::sync::Arc;
use tracing::debug;

/// Commands understood by the relay bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/trades <PAIR>`; `None` unless exactly one argument was given
    Trades(Option<String>),

    /// `/id`: echo the caller's chat identifier
    Id,

    /// `/start` or `/help`
    Help,
}

impl BotCommand {
    /// Parse a chat message; `None` for plain text and unknown commands
    ///
    /// Command names are case-insensitive and may carry a `@botname` suffix.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = words.collect();

        match name.as_str() {
            "trades" => {
                let pair = match args.as_slice() {
                    [pair] => Some((*pair).to_string()),
                    _ => None,
                };
                Some(BotCommand::Trades(pair))
            }
            "id" => Some(BotCommand::Id),
            "start" | "help" => Some(BotCommand::Help),
            _ => None,
        }
    }
}

/// Produces replies for parsed commands from the shared relay state
#[derive(Clone)]
pub struct CommandHandler {
    pairs: Arc<PairAllowList>,
    state: Arc<RelayState>,
}

impl CommandHandler {
    pub fn new(pairs: Arc<PairAllowList>, state: Arc<RelayState>) -> Self {
        Self { pairs, state }
    }

    /// Reply to one chat message; `None` when the text is not a command
    pub async fn reply_to(&self, text: &str, chat_id: i64) -> Option<String> {
        match BotCommand::parse(text) {
            Some(command) => Some(self.respond(&command, chat_id).await),
            None => {
                debug!(chat_id, "Ignoring non-command message");
                None
            }
        }
    }

    pub async fn respond(&self, command: &BotCommand, chat_id: i64) -> String {
        match command {
            BotCommand::Trades(Some(pair)) => {
                get_recent_trades(pair, &self.pairs, &self.state)
                    .await
                    .to_string()
            }
            BotCommand::Trades(None) => self.usage(),
            BotCommand::Id => format!("Your chat id: {}", chat_id),
            BotCommand::Help => self.help(),
        }
    }

    fn usage(&self) -> String {
        let example = self
            .pairs
            .iter()
            .next()
            .map_or("BTC_USDT", |pair| pair.as_str());
        format!(
            "Usage: /trades <PAIR>, e.g. /trades {}\nAvailable pairs: {}",
            example, self.pairs
        )
    }

    fn help(&self) -> String {
        format!(
            "Live trade relay bot.\n\n\
             Commands:\n\
             /trades <PAIR> - last {} trades for a pair\n\
             /id - show this chat's id\n\n\
             Available pairs: {}",
            RECENT_TRADES_SHOWN,
            self.pairs
        )
    }
}
