//! Columns of a streaming frame.

use serde::{Deserialize, Serialize};

use crate::buffer::ValueBuffer;
use crate::labels::Labels;
use crate::schema::{FieldConfig, FieldSchema, FieldType};
use crate::value::FieldValue;

/// A named, typed column and its buffered values.
///
/// The frame hands out `&Field` views and owned copies only; the value
/// buffer is mutated exclusively by the frame's push path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name.
    pub name: String,

    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Display configuration, passed through untouched.
    #[serde(default)]
    pub config: FieldConfig,

    /// Series labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    /// Buffered values, oldest first.
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl Field {
    /// Creates an empty column from its schema description.
    pub fn from_schema(schema: &FieldSchema) -> Self {
        Self {
            name: schema.name.clone(),
            field_type: schema.field_type,
            config: schema.config.clone().unwrap_or_default(),
            labels: schema.labels.clone(),
            values: Vec::new(),
        }
    }

    /// Creates a column holding `len` gap-fill placeholders.
    pub fn placeholder(schema: &FieldSchema, len: usize) -> Self {
        Self {
            values: vec![FieldValue::Null; len],
            ..Self::from_schema(schema)
        }
    }

    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no values are buffered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The schema description of this column, without its values.
    pub fn schema(&self) -> FieldSchema {
        FieldSchema {
            name: self.name.clone(),
            field_type: self.field_type,
            config: Some(self.config.clone()),
            labels: self.labels.clone(),
        }
    }

    /// Numeric view of the values; non-numeric cells read as `None`.
    pub fn numbers(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(FieldValue::as_f64)
    }
}

impl ValueBuffer for Field {
    fn values(&self) -> &[FieldValue] {
        &self.values
    }

    fn values_mut(&mut self) -> &mut Vec<FieldValue> {
        &mut self.values
    }
}
