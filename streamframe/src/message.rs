//! Incoming messages.
//!
//! A message is the unit the transport hands to a frame: an optional schema
//! and an optional batch of rows, delivered column-wise.
//!
//! ```json
//! {
//!   "schema": {"refId": "A", "fields": [{"name": "time", "type": "time"}, {"name": "value", "type": "number"}]},
//!   "data": {"values": [[1700000000000, 1700000001000], [1.5, null]], "entities": [null, {"NaN": [1]}]}
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PushError, Result};
use crate::schema::FrameSchema;
use crate::value::{FieldValue, FieldValueEntities};

/// One update for a streaming frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrameMessage {
    /// New schema, if the sender's column layout or metadata changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FrameSchema>,

    /// New rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FrameData>,
}

impl DataFrameMessage {
    /// A message carrying both a schema and rows.
    pub fn new(schema: FrameSchema, values: Vec<Vec<FieldValue>>) -> Self {
        Self {
            schema: Some(schema),
            data: Some(FrameData::new(values)),
        }
    }

    /// A message carrying only a schema.
    pub fn schema_only(schema: FrameSchema) -> Self {
        Self {
            schema: Some(schema),
            data: None,
        }
    }

    /// A message carrying only rows.
    pub fn values(values: Vec<Vec<FieldValue>>) -> Self {
        Self {
            schema: None,
            data: Some(FrameData::new(values)),
        }
    }

    /// Parses a message from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Serialization`](crate::error::FrameError::Serialization)
    /// if `json` is not a valid message.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Rows of a message, one array per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    /// Column-wise values.
    #[serde(default)]
    pub values: Vec<Vec<FieldValue>>,

    /// Per-array markers for cells JSON cannot express.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Option<FieldValueEntities>>>,
}

impl FrameData {
    /// Creates a payload without entity markers.
    pub fn new(values: Vec<Vec<FieldValue>>) -> Self {
        Self {
            values,
            entities: None,
        }
    }

    /// Number of rows, taken from the first array.
    pub fn row_count(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// Returns `true` when the payload carries no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Restores `NaN`, `±Inf` and undefined cells listed in `entities`, then
    /// drops the markers.
    pub fn decode_entities(&mut self) {
        let Some(entities) = self.entities.take() else {
            return;
        };
        for (values, entities) in self.values.iter_mut().zip(entities) {
            if let Some(entities) = entities {
                entities.decode(values);
            }
        }
    }
}

/// Checks that every array in `values` has the same number of rows.
pub(crate) fn check_rectangular(values: &[Vec<FieldValue>]) -> std::result::Result<usize, PushError> {
    let expected = values.first().map_or(0, Vec::len);
    for (column, array) in values.iter().enumerate() {
        if array.len() != expected {
            return Err(PushError::RaggedBatch {
                column,
                expected,
                received: array.len(),
            });
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_parse_message() {
        let message = DataFrameMessage::from_json(
            r#"{
                "schema": {"name": "cpu", "refId": "A", "meta": {"x": 1},
                           "fields": [{"name": "time", "type": "time"},
                                      {"name": "value", "type": "number", "config": {"unit": "percent"}}]},
                "data": {"values": [[1, 2], [0.5, null]], "entities": [null, {"Inf": [1]}]}
            }"#,
        )
        .unwrap();

        let schema = message.schema.unwrap();
        assert_eq!(schema.name.as_deref(), Some("cpu"));
        assert_eq!(schema.ref_id.as_deref(), Some("A"));
        assert_eq!(schema.fields[0].field_type, FieldType::Time);
        assert!(schema.fields[1].config.is_some());

        let mut data = message.data.unwrap();
        assert_eq!(data.row_count(), 2);
        data.decode_entities();
        assert!(data.entities.is_none());
        assert_eq!(data.values[1][1], FieldValue::Number(f64::INFINITY));
    }

    #[test]
    fn test_empty_message() {
        let message = DataFrameMessage::from_json("{}").unwrap();
        assert_eq!(message, DataFrameMessage::default());
        assert!(FrameData::default().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(DataFrameMessage::from_json("{").is_err());
    }

    #[test]
    fn test_check_rectangular() {
        let values = vec![vec![FieldValue::from(1.0)], vec![FieldValue::from(2.0)]];
        assert_eq!(check_rectangular(&values), Ok(1));

        let ragged = vec![vec![FieldValue::from(1.0)], vec![]];
        assert_eq!(
            check_rectangular(&ragged),
            Err(PushError::RaggedBatch {
                column: 1,
                expected: 1,
                received: 0
            })
        );

        assert_eq!(check_rectangular(&[]), Ok(0));
    }
}
