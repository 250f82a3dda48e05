//! Canonicalization of raw field values pulled out of heterogeneous feeds.
//!
//! Route identifiers and timestamps arrive in whatever shape the publishing
//! agency chose, so both normalizers accept any JSON value and degrade to
//! "no value" instead of failing.

use chrono::{DateTime, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Numeric timestamps above this magnitude are treated as milliseconds,
/// below as seconds. Heuristic disambiguation, not a format guarantee.
const MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

/// Current instant as an ISO-8601 string, the format stored alongside
/// every record and audit row.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Maps a raw route value to its canonical string key.
///
/// Empty string means "no match possible": it never equals any normalized
/// query route.
pub fn normalize_route(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_route_str(s),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => (f.trunc() as i64).to_string(),
            _ => String::new(),
        },
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// String form of [`normalize_route`]: trim, lowercase, and canonicalize
/// purely numeric routes through integer parsing so "04" and "4" agree.
pub fn normalize_route_str(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return String::new();
    }

    if cleaned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = cleaned.parse::<u64>() {
            return n.to_string();
        }
    }

    cleaned
}

/// Parses a raw timestamp candidate. Unparseable input is an expected
/// condition and yields `None`, never an error.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let f = n.as_f64().filter(|f| f.is_finite())?;
            let millis = if f > MILLIS_THRESHOLD { f } else { f * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// String timestamp parsing: full date/time layouts first, then a bare
/// `HH:MM[:SS]` interpreted as that time of day on the current UTC date
/// (some feeds report only time-of-day).
pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    const LAYOUTS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for layout in LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    parse_time_of_day(trimmed)
        .map(|time| Utc.from_utc_datetime(&Utc::now().date_naive().and_time(time)))
}

/// Accepts `H:MM`, `HH:MM`, and `HH:MM:SS`.
fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    if parts[0].is_empty() || parts[0].len() > 2 || parts[1].len() != 2 {
        return None;
    }
    if parts.len() == 3 && parts[2].len() != 2 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let hours: u32 = parts[0].parse().ok()?;
    let minutes: u32 = parts[1].parse().ok()?;
    let seconds: u32 = if parts.len() == 3 {
        parts[2].parse().ok()?
    } else {
        0
    };

    NaiveTime::from_hms_opt(hours, minutes, seconds)
}
