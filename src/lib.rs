// Library exports for trade-relay

pub mod error;

pub mod config; // Configuration management

// Exchange WebSocket integration
pub mod exchange; // Wire types and the feed connector

pub mod trades; // Pair allow-list, trade buffer, query handler

pub mod bot; // Command parsing, operator notifications, Telegram transport
