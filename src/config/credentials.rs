//! Bot Credential Handling
//!
//! The bot token is loaded from the environment and wrapped so it never shows
//! up in logs or error messages.

use std::fmt;

/// Secure string wrapper that masks sensitive data in logs
///
/// Debug output shows only `SecretString(***)` and Display shows the
/// truncated form `first4...last4`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        SecretString(value)
    }

    /// Returns a reference to the inner string
    ///
    /// Only use this when handing the token to the transport client.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Masked form for safe logging (`1234...wxyz`, or `***` when short)
    pub fn masked(&self) -> String {
        let s = &self.0;
        let chars: Vec<char> = s.chars().collect();
        if chars.len() <= 8 {
            return "***".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString::new(s)
    }
}
