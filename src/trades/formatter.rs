// Plain-text formatting utilities for trade replies

use crate::trades::types::Trade;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Group the integer part of a decimal string with spaces every 3 digits
///
/// "113559.99" -> "113 559.99", "-1234" -> "-1 234"
pub fn group_thousands(value: &str) -> String {
    let (sign, unsigned) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let (integer_part, fractional_part) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(value.len() + integer_part.len() / 3);
    let len = integer_part.len();
    for (i, ch) in integer_part.chars().enumerate() {
        grouped.push(ch);
        // Space every 3 digits from the right (but not at the end)
        if (len - i - 1) % 3 == 0 && i < len - 1 {
            grouped.push(' ');
        }
    }

    match fractional_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Format a decimal keeping the exchange's precision, with thousand separators
pub fn format_decimal(value: &Decimal) -> String {
    group_thousands(&value.to_string())
}

/// Format Unix milliseconds as UTC wall-clock time
///
/// Falls back to the raw number if it is outside chrono's range.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// One reply line for a trade: time, side, price, quantity
pub fn format_trade_line(trade: &Trade) -> String {
    format!(
        "{} | {} | price {} | qty {}",
        format_timestamp(trade.timestamp_ms),
        trade.side.to_uppercase(),
        format_decimal(&trade.price),
        format_decimal(&trade.quantity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trades::types::TradingPair;
    use serde_json::Map;
    use std::str::FromStr;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("113559.99"), "113 559.99");
        assert_eq!(group_thousands("1000000"), "1 000 000");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("0.00012"), "0.00012");
        assert_eq!(group_thousands("-1234.5"), "-1 234.5");
    }

    #[test]
    fn test_format_decimal_preserves_scale() {
        let price = Decimal::from_str("16800.50").unwrap();
        assert_eq!(format_decimal(&price), "16 800.50");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_672_531_200_000), "2023-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn test_format_trade_line() {
        let trade = Trade {
            pair: TradingPair::parse("BTC_USDT").unwrap(),
            price: Decimal::from_str("42000.10").unwrap(),
            quantity: Decimal::from_str("0.0125").unwrap(),
            side: "sell".to_string(),
            timestamp_ms: 1_672_531_200_000,
            extra: Map::new(),
        };

        assert_eq!(
            format_trade_line(&trade),
            "2023-01-01 00:00:00 UTC | SELL | price 42 000.10 | qty 0.0125"
        );
    }
}
