//! Schema types for streamed frames.
//!
//! A schema describes the columns of a frame (name, declared type, display
//! configuration, labels) independently of their buffered values. Incoming
//! messages may carry a [`FrameSchema`]; the frame compares it against the
//! schema it last applied to decide whether buffered values survive.

use serde::{Deserialize, Serialize};

use crate::labels::Labels;

/// Opaque per-column display configuration, passed through untouched.
pub type FieldConfig = serde_json::Map<String, serde_json::Value>;

/// Opaque frame metadata, passed through untouched.
pub type FrameMeta = serde_json::Map<String, serde_json::Value>;

/// Names that mark a string field as the labels column.
const LABELS_FIELD_NAMES: [&str; 2] = ["labels", "Labels"];

/// Declared type of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Epoch milliseconds.
    Time,
    /// Numeric values.
    Number,
    /// String values.
    String,
    /// Boolean values.
    Boolean,
    /// Anything else, including unknown type names on the wire.
    #[default]
    #[serde(other)]
    Other,
}

/// Description of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Column name.
    pub name: String,

    /// Declared type; absent on the wire means [`FieldType::Other`].
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Display configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FieldConfig>,

    /// Series labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

impl FieldSchema {
    /// Creates a field description with no config and no labels.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            config: None,
            labels: None,
        }
    }

    /// Sets the labels of this field.
    #[must_use]
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sets the display configuration of this field.
    #[must_use]
    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = Some(config);
        self
    }

    fn is_labels_column(&self) -> bool {
        self.field_type == FieldType::String && LABELS_FIELD_NAMES.contains(&self.name.as_str())
    }
}

/// Schema section of an incoming message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSchema {
    /// Frame name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Query reference identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    /// Frame metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,

    /// Ordered column descriptions.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl FrameSchema {
    /// Creates a schema from its fields.
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Resolves how a frame should lay out columns for this schema.
    ///
    /// A string field named `labels` (or `Labels`) at any position turns on
    /// labels mode when the schema also has a time field.
    pub fn layout(&self) -> SchemaLayout {
        let has_time = self.fields.iter().any(|f| f.field_type == FieldType::Time);
        let labels_index = self
            .fields
            .iter()
            .position(FieldSchema::is_labels_column)
            .filter(|_| has_time);

        let Some(labels_index) = labels_index else {
            return SchemaLayout {
                mode: PushMode::Wide,
                labels_index: None,
                payload_time_index: self.fields.iter().position(|f| f.field_type == FieldType::Time),
                base_fields: self.fields.clone(),
            };
        };

        let rest: Vec<&FieldSchema> = self
            .fields
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != labels_index)
            .map(|(_, f)| f)
            .collect();
        // Guarded by `has_time` above.
        let time = rest
            .iter()
            .position(|f| f.field_type == FieldType::Time)
            .unwrap_or_default();

        let mut base_fields = Vec::with_capacity(rest.len());
        base_fields.push(rest[time].clone());
        base_fields.extend(
            rest.iter()
                .enumerate()
                .filter(|&(i, _)| i != time)
                .map(|(_, &f)| f.clone()),
        );

        SchemaLayout {
            mode: PushMode::Labels,
            labels_index: Some(labels_index),
            payload_time_index: Some(time),
            base_fields,
        }
    }
}

/// How a frame maps payload arrays onto its columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMode {
    /// One payload array per column.
    #[default]
    Wide,
    /// The payload carries a labels column whose rows are fanned out into
    /// one column set per distinct label set.
    Labels,
}

/// Column layout resolved from a [`FrameSchema`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaLayout {
    /// Push mode implied by the schema.
    pub mode: PushMode,

    /// Fields the frame builds columns from. In labels mode the labels column
    /// is removed and the time field is moved to the front.
    pub base_fields: Vec<FieldSchema>,

    /// Position of the labels array in the payload, in labels mode.
    pub labels_index: Option<usize>,

    /// Index of the primary time field among the payload's value arrays,
    /// counted without the labels array.
    pub payload_time_index: Option<usize>,
}

impl SchemaLayout {
    /// Index of the primary time column among the frame's columns.
    pub fn time_index(&self) -> Option<usize> {
        match self.mode {
            PushMode::Wide => self.payload_time_index,
            PushMode::Labels => Some(0),
        }
    }

    /// Number of value fields repeated for every label series.
    pub fn value_field_count(&self) -> usize {
        match self.mode {
            PushMode::Wide => self.base_fields.len(),
            PushMode::Labels => self.base_fields.len() - 1,
        }
    }
}

/// Returns `true` when both field lists have the same names and types in the
/// same order. Config and labels do not count as structure.
pub fn has_same_structure(current: &[FieldSchema], incoming: &[FieldSchema]) -> bool {
    current.len() == incoming.len()
        && current
            .iter()
            .zip(incoming)
            .all(|(a, b)| a.name == b.name && a.field_type == b.field_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_schema() -> FrameSchema {
        FrameSchema::new(vec![
            FieldSchema::new("labels", FieldType::String),
            FieldSchema::new("speed", FieldType::Number),
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("light", FieldType::Number),
        ])
    }

    #[test]
    fn test_field_type_wire_names() {
        let fields: Vec<FieldSchema> = serde_json::from_str(
            r#"[{"name": "t", "type": "time"}, {"name": "v"}, {"name": "x", "type": "frame"}]"#,
        )
        .unwrap();

        assert_eq!(fields[0].field_type, FieldType::Time);
        assert_eq!(fields[1].field_type, FieldType::Other);
        assert_eq!(fields[2].field_type, FieldType::Other);
    }

    #[test]
    fn test_wide_layout() {
        let schema = FrameSchema::new(vec![
            FieldSchema::new("value", FieldType::Number),
            FieldSchema::new("time", FieldType::Time),
        ]);

        let layout = schema.layout();
        assert_eq!(layout.mode, PushMode::Wide);
        assert_eq!(layout.time_index(), Some(1));
        assert_eq!(layout.base_fields, schema.fields);
        assert_eq!(layout.value_field_count(), 2);
    }

    #[test]
    fn test_wide_layout_without_time() {
        let schema = FrameSchema::new(vec![FieldSchema::new("value", FieldType::Number)]);
        assert_eq!(schema.layout().time_index(), None);
    }

    #[test]
    fn test_labels_layout_moves_time_first() {
        let layout = labels_schema().layout();

        assert_eq!(layout.mode, PushMode::Labels);
        assert_eq!(layout.labels_index, Some(0));
        assert_eq!(layout.payload_time_index, Some(1));
        assert_eq!(layout.time_index(), Some(0));
        let names: Vec<_> = layout.base_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "speed", "light"]);
        assert_eq!(layout.value_field_count(), 2);
    }

    #[test]
    fn test_labels_column_after_time() {
        let schema = FrameSchema::new(vec![
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("Labels", FieldType::String),
            FieldSchema::new("speed", FieldType::Number),
        ]);

        let layout = schema.layout();

        assert_eq!(layout.mode, PushMode::Labels);
        assert_eq!(layout.labels_index, Some(1));
        assert_eq!(layout.payload_time_index, Some(0));
        let names: Vec<_> = layout.base_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "speed"]);
    }

    #[test]
    fn test_labels_column_last() {
        let schema = FrameSchema::new(vec![
            FieldSchema::new("speed", FieldType::Number),
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("labels", FieldType::String),
        ]);

        let layout = schema.layout();

        assert_eq!(layout.labels_index, Some(2));
        assert_eq!(layout.payload_time_index, Some(1));
        let names: Vec<_> = layout.base_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "speed"]);
    }

    #[test]
    fn test_labels_column_requires_time_field() {
        let schema = FrameSchema::new(vec![
            FieldSchema::new("labels", FieldType::String),
            FieldSchema::new("speed", FieldType::Number),
        ]);
        assert_eq!(schema.layout().mode, PushMode::Wide);

        // Only a string column counts as a labels column
        let schema = FrameSchema::new(vec![
            FieldSchema::new("labels", FieldType::Other),
            FieldSchema::new("time", FieldType::Time),
        ]);
        assert_eq!(schema.layout().mode, PushMode::Wide);
    }

    #[test]
    fn test_has_same_structure() {
        let a = vec![
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("value", FieldType::Number),
        ];

        let mut b = a.clone();
        b[1].config = Some(FieldConfig::new());
        b[1].labels = Some(Labels::from([("host".to_string(), "a".to_string())]));
        assert!(has_same_structure(&a, &b));

        let mut renamed = a.clone();
        renamed[1].name = "other".to_string();
        assert!(!has_same_structure(&a, &renamed));

        let mut retyped = a.clone();
        retyped[1].field_type = FieldType::String;
        assert!(!has_same_structure(&a, &retyped));

        assert!(!has_same_structure(&a, &a[..1]));
        assert!(has_same_structure(&[], &[]));
    }
}
