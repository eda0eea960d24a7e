use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Key every row carries in its serialized form; no field may use it as a name.
pub const ROW_ID_KEY: &str = "id";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Email,
    Boolean,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Date,
        FieldType::Email,
        FieldType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Boolean => "boolean",
        }
    }

    /// The value a cell of this type holds when nothing was entered.
    pub fn empty_value(&self) -> FieldValue {
        match self {
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Number => FieldValue::Number(0.0),
            FieldType::Date => FieldValue::Date(None),
            FieldType::Email => FieldValue::Email(String::new()),
            FieldType::Boolean => FieldValue::Boolean(false),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "email" => Ok(FieldType::Email),
            "boolean" => Ok(FieldType::Boolean),
            other => Err(format!("Unknown field type: {}", other)),
        }
    }
}

/// A named, typed column of the ad-hoc schema.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn create(name: &str, field_type: FieldType, required: bool) -> Self {
        Field {
            id: new_id(),
            name: name.trim().to_string(),
            field_type,
            required,
        }
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Canonical in-memory value of a cell, keyed by the owning field's type.
///
/// Serializes to the plain runtime shape (string, number or bool) so the
/// persisted rows look like `{"id": "..", "Age": 30, "Active": true}`.
/// Deserialization is shape-driven; callers re-conform the result to the
/// owning field with [`crate::normalize::conform`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(Option<NaiveDate>),
    Email(String),
    Boolean(bool),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Email(_) => FieldType::Email,
            FieldValue::Boolean(_) => FieldType::Boolean,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Email(s) => s.is_empty(),
            FieldValue::Date(d) => d.is_none(),
            FieldValue::Number(_) | FieldValue::Boolean(_) => false,
        }
    }

    /// Numeric reading used for plotting; anything non-numeric reads as 0.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Number(n) if n.is_finite() => *n,
            FieldValue::Boolean(true) => 1.0,
            FieldValue::Text(s) | FieldValue::Email(s) => crate::inference::js_number(s)
                .filter(|n| n.is_finite())
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Email(s) => f.write_str(s),
            FieldValue::Number(n) => f.write_str(&format_number(*n)),
            FieldValue::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Date(None) => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(RawValueVisitor)?;
        Ok(match raw {
            RawValue::Empty => FieldValue::Text(String::new()),
            RawValue::Bool(b) => FieldValue::Boolean(b),
            RawValue::Number(n) => FieldValue::Number(n),
            RawValue::Text(s) => FieldValue::Text(s),
        })
    }
}

/// An untyped cell value as it comes out of a spreadsheet or a request body.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Null, empty or whitespace-only.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Bool(_) | RawValue::Number(_) => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Empty => Ok(()),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Number(n) => f.write_str(&format_number(*n)),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<&FieldValue> for RawValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Number(n) => RawValue::Number(*n),
            FieldValue::Boolean(b) => RawValue::Bool(*b),
            other if other.is_empty() => RawValue::Empty,
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawValue::Empty => serializer.serialize_unit(),
            RawValue::Bool(b) => serializer.serialize_bool(*b),
            RawValue::Number(n) => serializer.serialize_f64(*n),
            RawValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawValueVisitor)
    }
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawValue, E> {
        Ok(RawValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
        Ok(RawValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
        Ok(RawValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawValue, E> {
        Ok(RawValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawValue, E> {
        Ok(RawValue::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Empty)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Empty)
    }
}

/// One record of the dataset. Values are keyed by field name.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Row {
    pub id: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn create(values: BTreeMap<String, FieldValue>) -> Self {
        Row {
            id: new_id(),
            values,
        }
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.values.get(field_name)
    }

    /// The stored value, or the field's empty value when the key is missing.
    pub fn value_for(&self, field: &Field) -> FieldValue {
        self.values
            .get(&field.name)
            .cloned()
            .unwrap_or_else(|| field.field_type.empty_value())
    }
}

/// String form of a number the way a browser prints it: integral values
/// without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_serializes_flat() {
        let mut values = BTreeMap::new();
        values.insert("Age".to_string(), FieldValue::Number(30.0));
        values.insert("Active".to_string(), FieldValue::Boolean(true));
        values.insert(
            "Joined".to_string(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15)),
        );
        let row = Row {
            id: "r1".to_string(),
            values,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["Age"], 30.0);
        assert_eq!(json["Active"], true);
        assert_eq!(json["Joined"], "2024-01-15");
    }

    #[test]
    fn number_formatting_drops_integral_fraction() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn raw_value_from_json() {
        let raw: Vec<RawValue> = serde_json::from_str(r#"["a", 1, true, null]"#).unwrap();
        assert_eq!(
            raw,
            vec![
                RawValue::Text("a".to_string()),
                RawValue::Number(1.0),
                RawValue::Bool(true),
                RawValue::Empty,
            ]
        );
    }
}
