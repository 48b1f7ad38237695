//! Telegram transport: operator notifier and the inbound command REPL.

use crate::bot::commands::CommandHandler;
use crate::bot::notifier::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{error, info};

/// Sends operator notifications to one Telegram chat
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Run the long-polling REPL, answering commands until Ctrl+C
pub async fn run_repl(bot: Bot, handler: CommandHandler) {
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let handler = handler.clone();
        async move {
            let Some(text) = msg.text() else {
                return respond(());
            };
            let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
            let chat_id = msg.chat.id;

            if let Some(reply) = handler.reply_to(text, chat_id.0).await {
                info!(user_id, chat_id = chat_id.0, command = %text, "Answering command");
                if let Err(e) = bot.send_message(chat_id, reply).await {
                    error!(user_id, chat_id = chat_id.0, error = %e, "Failed to send reply");
                }
            }
            respond(())
        }
    })
    .await;
}
