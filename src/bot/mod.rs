//! Messaging side of the relay
//!
//! Transport-agnostic command parsing and operator notifications, plus the
//! Telegram adapter when the `telegram` feature is enabled.

pub mod commands;
pub mod notifier;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use commands::{BotCommand, CommandHandler};
pub use notifier::{LogNotifier, Notifier};

#[cfg(feature = "telegram")]
pub use telegram::{run_repl, TelegramNotifier};
