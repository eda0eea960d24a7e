use crate::field::{Field, FieldType, FieldValue, ROW_ID_KEY, RawValue, Row};
use crate::normalize::{conform, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw cell values for one row, keyed by field name.
pub type RawRecord = BTreeMap<String, RawValue>;

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("field name cannot be empty")]
    EmptyFieldName,

    #[error("a field named `{0}` already exists")]
    DuplicateFieldName(String),

    #[error("`{0}` is reserved and cannot be used as a field name")]
    ReservedFieldName(String),

    #[error("field `{0}` not found")]
    FieldNotFound(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("row `{0}` not found")]
    RowNotFound(String),

    #[error("a value for `{0}` is required")]
    MissingRequiredValue(String),
}

/// Partial change to a field definition; `None` leaves the attribute as is.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub required: Option<bool>,
}

/// The live schema and its rows. Field order is display order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a dataset from loaded parts, re-conforming every stored value
    /// to the type its field declares.
    pub fn from_parts(fields: Vec<Field>, mut rows: Vec<Row>) -> Self {
        for row in rows.iter_mut() {
            for field in &fields {
                if let Some(value) = row.values.get_mut(&field.name) {
                    *value = conform(value, field.field_type);
                }
            }
        }
        Dataset { fields, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.rows.is_empty()
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Fields that may be plotted on the y-axis.
    pub fn numeric_fields(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::Number)
            .collect()
    }

    fn field_index(&self, id: &str) -> Result<usize, DatasetError> {
        self.fields
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| DatasetError::FieldNotFound(id.to_string()))
    }

    fn row_index(&self, id: &str) -> Result<usize, DatasetError> {
        self.rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DatasetError::RowNotFound(id.to_string()))
    }

    fn check_name(&self, name: &str, except_id: Option<&str>) -> Result<String, DatasetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatasetError::EmptyFieldName);
        }
        if name == ROW_ID_KEY {
            return Err(DatasetError::ReservedFieldName(name.to_string()));
        }
        let taken = self
            .fields
            .iter()
            .any(|f| f.name == name && Some(f.id.as_str()) != except_id);
        if taken {
            return Err(DatasetError::DuplicateFieldName(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Append a field; existing rows get the type's empty value for it.
    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        required: bool,
    ) -> Result<&Field, DatasetError> {
        let name = self.check_name(name, None)?;
        let field = Field::create(&name, field_type, required);

        for row in self.rows.iter_mut() {
            row.values
                .entry(field.name.clone())
                .or_insert_with(|| field_type.empty_value());
        }

        let index = self.fields.len();
        self.fields.push(field);
        Ok(&self.fields[index])
    }

    /// Rename, retype or toggle `required` on a field. Row keys follow a
    /// rename and row values are re-conformed after a type change.
    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> Result<&Field, DatasetError> {
        let index = self.field_index(id)?;
        let new_name = match &update.name {
            Some(name) => Some(self.check_name(name, Some(id))?),
            None => None,
        };

        let old_name = self.fields[index].name.clone();
        if let Some(name) = new_name {
            if name != old_name {
                for row in self.rows.iter_mut() {
                    if let Some(value) = row.values.remove(&old_name) {
                        row.values.insert(name.clone(), value);
                    }
                }
                self.fields[index].name = name;
            }
        }

        if let Some(field_type) = update.field_type {
            if field_type != self.fields[index].field_type {
                let name = self.fields[index].name.clone();
                for row in self.rows.iter_mut() {
                    if let Some(value) = row.values.get_mut(&name) {
                        *value = conform(value, field_type);
                    }
                }
                self.fields[index].field_type = field_type;
            }
        }

        if let Some(required) = update.required {
            self.fields[index].required = required;
        }

        Ok(&self.fields[index])
    }

    /// Remove a field and its value from every row.
    pub fn delete_field(&mut self, id: &str) -> Result<Field, DatasetError> {
        let index = self.field_index(id)?;
        let field = self.fields.remove(index);
        for row in self.rows.iter_mut() {
            row.values.remove(&field.name);
        }
        Ok(field)
    }

    /// Move a field to `new_index` in display order (clamped to the end).
    pub fn move_field(&mut self, id: &str, new_index: usize) -> Result<(), DatasetError> {
        let index = self.field_index(id)?;
        let field = self.fields.remove(index);
        let target = new_index.min(self.fields.len());
        self.fields.insert(target, field);
        Ok(())
    }

    fn check_record(&self, record: &RawRecord, complete: bool) -> Result<(), DatasetError> {
        if let Some(unknown) = record.keys().find(|name| self.field_by_name(name).is_none()) {
            return Err(DatasetError::UnknownField(unknown.clone()));
        }
        for field in self.fields.iter().filter(|f| f.required) {
            let missing = match record.get(&field.name) {
                Some(raw) => raw.is_empty(),
                None => complete,
            };
            if missing {
                return Err(DatasetError::MissingRequiredValue(field.name.clone()));
            }
        }
        Ok(())
    }

    /// Add a row; every field gets a key, absent values become empty.
    pub fn add_row(&mut self, record: &RawRecord) -> Result<&Row, DatasetError> {
        self.check_record(record, true)?;

        let values: BTreeMap<String, FieldValue> = self
            .fields
            .iter()
            .map(|field| {
                let raw = record.get(&field.name).unwrap_or(&RawValue::Empty);
                (field.name.clone(), normalize(raw, field.field_type))
            })
            .collect();

        let index = self.rows.len();
        self.rows.push(Row::create(values));
        Ok(&self.rows[index])
    }

    /// Overwrite the given values of an existing row.
    pub fn update_row(&mut self, id: &str, record: &RawRecord) -> Result<&Row, DatasetError> {
        let index = self.row_index(id)?;
        self.check_record(record, false)?;

        for (name, raw) in record {
            if let Some(field) = self.fields.iter().find(|f| &f.name == name) {
                let value = normalize(raw, field.field_type);
                self.rows[index].values.insert(name.clone(), value);
            }
        }
        Ok(&self.rows[index])
    }

    pub fn delete_row(&mut self, id: &str) -> Result<Row, DatasetError> {
        let index = self.row_index(id)?;
        Ok(self.rows.remove(index))
    }

    /// Wholesale replacement, as done when an import is confirmed.
    pub fn replace(&mut self, fields: Vec<Field>, rows: Vec<Row>) {
        self.fields = fields;
        self.rows = rows;
    }
}
