//! Configuration Management
//!
//! This module handles loading the relay configuration and the bot credential.

pub mod credentials;
pub mod relay;

// Re-export
pub use credentials::SecretString;
pub use relay::RelayConfig;
