//! Message formatting for Telegram alerts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{DetectionResult, DetectorKind};

/// Format a detection into a Telegram `MarkdownV2` message.
pub fn alert_message(detection: &DetectionResult) -> String {
    let (emoji, title) = match detection.kind {
        DetectorKind::WhaleCluster => ("🐋", "Whale Cluster"),
        DetectorKind::LiquidationStorm => ("⚡", "Liquidation Storm"),
    };

    let pct = (detection.dominance_ratio * Decimal::from(100)).round_dp(1);

    format!(
        "{} *{}: {}*\n\
        \n\
        📈 Side: `{}`\n\
        💵 Volume: `{}` in `{}s`\n\
        📊 Dominance: `{}%`\n\
        🔢 Events: `{}`\n\
        🏷 Group: `{}`",
        emoji,
        title,
        escape_markdown(detection.instrument.as_str()),
        detection.dominant_side,
        format_usd(detection.total_volume_usd),
        detection.window_secs,
        pct,
        detection.event_count,
        detection.group
    )
}

/// Format a dollar amount with thousands separators, e.g. `$3,500,000`.
pub fn format_usd(amount: Decimal) -> String {
    let whole = amount.round().to_i128().unwrap_or(0).unsigned_abs();
    let digits = whole.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${grouped}")
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}
