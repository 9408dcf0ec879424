use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TRUNCATE: usize = 100;

/// Human label for a status value: the first underscore becomes a space and
/// every word starts upper-case (`in_progress` -> `In Progress`).
pub fn status_label(status: &str) -> String {
    let spaced = status.replacen('_', " ", 1);
    let mut label = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && at_word_start {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
        at_word_start = !is_word;
    }
    label
}

/// Dashboard zone for a country code; anything unlisted reads as UTC.
pub fn timezone_for(country: &str) -> Tz {
    match country {
        "IN" => Tz::Asia__Kolkata,
        "PK" => Tz::Asia__Karachi,
        "US" => Tz::America__New_York,
        "SA" => Tz::Asia__Riyadh,
        "LK" => Tz::Asia__Colombo,
        _ => Tz::UTC,
    }
}

/// Wall-clock time in the country's zone, as `hh:mm AM/PM`.
pub fn local_time(country: &str, now: DateTime<Utc>) -> String {
    now.with_timezone(&timezone_for(country))
        .format("%I:%M %p")
        .to_string()
}

pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
