use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// `1234567.891` -> `1 234 567.89 ISK`
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{fraction} ISK")
}

/// Skill levels run from I to V
pub fn to_roman(level: u8) -> Option<&'static str> {
    match level {
        1 => Some("I"),
        2 => Some("II"),
        3 => Some("III"),
        4 => Some("IV"),
        5 => Some("V"),
        _ => None,
    }
}

/// `1d 02h 03m 04s`, omitting zero components. Negative spans render as `0s`.
pub fn format_duration(span: TimeDelta) -> String {
    let total = span.num_seconds().max(0);
    let (days, hours, minutes, seconds) =
        (total / 86_400, total / 3600 % 24, total / 60 % 60, total % 60);

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours:02}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes:02}m"));
    }
    if seconds > 0 {
        parts.push(format!("{seconds:02}s"));
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Time left on an order, always with every component: `12d 3h 0m`
pub fn format_remaining(span: TimeDelta) -> String {
    let total = span.num_minutes().max(0);
    format!("{}d {}h {}m", total / 1440, total / 60 % 24, total % 60)
}

pub fn time_until(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_duration(at - now)
}

pub fn time_since(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_duration(now - at)
}
