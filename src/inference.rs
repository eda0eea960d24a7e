use crate::field::{FieldType, RawValue};
use chrono::{DateTime, NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
    static ref NUMERIC_PREFIX: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap();
    static ref LOOSE_DATE: Regex = Regex::new(r"\d{1,4}[-/]\d{1,2}[-/]\d{1,4}").unwrap();
    static ref NUMERIC_DATE: Regex = Regex::new(
        r"^(\d{1,4})[-/](\d{1,2})[-/](\d{1,4})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$"
    )
    .unwrap();
}

/// Spellings recognised as booleans during inference, matched either exactly
/// or after lower-casing the sample.
pub const BOOLEAN_WORDS: [&str; 6] = ["true", "false", "yes", "no", "Y", "N"];

/// Month-name layouts accepted in addition to the numeric ones.
const TEXT_DATE_FORMATS: [&str; 6] = [
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Guess the semantic type of a column from one sample value.
///
/// Rules are tried in order and the first match wins:
/// empty → text, boolean word → boolean, numeric → number,
/// date (parseable and shaped like `d/m/y`) → date, `@` and `.` → email,
/// anything else → text. Numeric strings such as `"2024"` therefore come out
/// as `number`, never `date`.
pub fn infer_type(sample: &RawValue) -> FieldType {
    if sample.is_empty() {
        return FieldType::Text;
    }

    match sample {
        RawValue::Bool(_) => FieldType::Boolean,
        RawValue::Number(n) if n.is_finite() => FieldType::Number,
        RawValue::Text(s) => infer_text_type(s),
        _ => FieldType::Text,
    }
}

fn is_boolean_word(s: &str) -> bool {
    BOOLEAN_WORDS.contains(&s) || BOOLEAN_WORDS.contains(&s.to_lowercase().as_str())
}

fn infer_text_type(s: &str) -> FieldType {
    if is_boolean_word(s) {
        FieldType::Boolean
    } else if is_numeric(s) {
        FieldType::Number
    } else if parse_date(s).is_some() && LOOSE_DATE.is_match(s) {
        FieldType::Date
    } else if s.contains('@') && s.contains('.') {
        FieldType::Email
    } else {
        FieldType::Text
    }
}

/// Infer a column type from its collected samples: only the first one counts.
pub fn infer_column(samples: &[RawValue]) -> FieldType {
    samples.first().map(infer_type).unwrap_or(FieldType::Text)
}

/// True when both the strict and the prefix parse yield a finite number.
pub fn is_numeric(s: &str) -> bool {
    let strict = js_number(s).is_some_and(f64::is_finite);
    let prefix = parse_float_prefix(s).is_some_and(f64::is_finite);
    strict && prefix
}

/// Strict numeric coercion of a whole string.
///
/// Surrounding whitespace is ignored, an empty string is 0, `0x`/`0o`/`0b`
/// prefixes are honoured and any trailing garbage makes the result `None`.
pub fn js_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
        }
    }

    match t {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    if !NUMERIC_LITERAL.is_match(t) {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Parse the longest numeric prefix of a string, ignoring what follows it.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    for (word, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if t.starts_with(word) {
            return Some(value);
        }
    }

    NUMERIC_PREFIX
        .find(t)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Parse a calendar date out of common spreadsheet spellings.
///
/// Accepts `YYYY-MM-DD` / `YYYY/MM/DD` (optionally followed by a time),
/// US-style `M/D/YYYY` with two-digit years mapped to 1950..2049, RFC 3339
/// timestamps and month-name forms like `March 5, 2024`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE.captures(t) {
        let first = &caps[1];
        let second: u32 = caps[2].parse().ok()?;
        let third = &caps[3];

        let date = if first.len() > 2 {
            let year: i32 = first.parse().ok()?;
            let day: u32 = third.parse().ok()?;
            NaiveDate::from_ymd_opt(year, second, day)?
        } else {
            let month: u32 = first.parse().ok()?;
            let mut year: i32 = third.parse().ok()?;
            if third.len() <= 2 {
                year += if year < 50 { 2000 } else { 1900 };
            }
            NaiveDate::from_ymd_opt(year, month, second)?
        };

        if let Some(hour) = caps.get(4) {
            let hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = caps[5].parse().ok()?;
            let second: u32 = match caps.get(6) {
                Some(sec) => sec.as_str().parse().ok()?,
                None => 0,
            };
            NaiveTime::from_hms_opt(hour, minute, second)?;
        }
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }

    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}
