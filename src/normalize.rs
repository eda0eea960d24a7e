use crate::field::{FieldType, FieldValue, RawValue};
use crate::inference::{js_number, parse_date};
use chrono::{Duration, NaiveDate};

/// Lower-cased spellings that normalize to `true`.
const TRUTHY: [&str; 4] = ["true", "yes", "y", "1"];

/// Largest serial number a spreadsheet can hold as a date (9999-12-31).
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

/// Coerce a raw cell into the canonical value for `field_type`.
///
/// Never fails: anything that cannot be read as the target type becomes that
/// type's empty value (`0`, `false`, `""`).
pub fn normalize(raw: &RawValue, field_type: FieldType) -> FieldValue {
    if raw.is_empty() {
        return field_type.empty_value();
    }

    match field_type {
        FieldType::Number => FieldValue::Number(to_number(raw)),
        FieldType::Boolean => FieldValue::Boolean(to_boolean(raw)),
        FieldType::Date => FieldValue::Date(to_date(raw)),
        FieldType::Email => FieldValue::Email(raw.to_string()),
        FieldType::Text => FieldValue::Text(raw.to_string()),
    }
}

/// Re-shape an already stored value so that it matches `field_type`.
pub fn conform(value: &FieldValue, field_type: FieldType) -> FieldValue {
    if value.field_type() == field_type {
        return value.clone();
    }
    normalize(&RawValue::from(value), field_type)
}

fn to_number(raw: &RawValue) -> f64 {
    let n = match raw {
        RawValue::Number(n) => *n,
        RawValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        RawValue::Text(s) => js_number(s).unwrap_or(0.0),
        RawValue::Empty => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn to_boolean(raw: &RawValue) -> bool {
    match raw {
        RawValue::Bool(b) => *b,
        other => {
            let lowered = other.to_string().to_lowercase();
            TRUTHY.contains(&lowered.as_str())
        }
    }
}

fn to_date(raw: &RawValue) -> Option<NaiveDate> {
    match raw {
        RawValue::Text(s) => parse_date(s),
        RawValue::Number(n) => serial_to_date(*n),
        RawValue::Bool(_) | RawValue::Empty => None,
    }
}

/// Convert a spreadsheet serial day number (1900 date system) into a date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    // Day 0 is 1899-12-30 once the fictitious 1900-02-29 is accounted for.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
