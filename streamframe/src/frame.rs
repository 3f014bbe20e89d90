//! The streaming data frame.
//!
//! [`StreamingDataFrame`] ties the other modules together. It owns the
//! columns, applies incoming schemas, fans labeled payloads out into series
//! columns, and runs the append-and-evict engine after every push.
//!
//! # Push path
//!
//! A push runs in two phases:
//!
//! 1. Validate: resolve the layout the message implies, decode value
//!    entities, and check that the payload is rectangular and carries the
//!    expected number of arrays. Nothing is mutated here.
//! 2. Commit: apply the schema (discarding buffered values if its structure
//!    changed), expand labeled rows, back-fill columns for new series, then
//!    append or replace and trim to the retention bounds.
//!
//! Every error is raised in the first phase, so a failed push leaves the
//! frame untouched.
//!
//! # Example Usage
//!
//! ```rust
//! use streamframe::{DataFrameMessage, FieldSchema, FieldType, FrameSchema, FieldValue};
//! use streamframe::{StreamingDataFrame, StreamingFrameOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = StreamingFrameOptions::new(Some(5), Some(300.0))?;
//! let mut frame = StreamingDataFrame::new(options)?;
//!
//! let schema = FrameSchema::new(vec![
//!     FieldSchema::new("time", FieldType::Time),
//!     FieldSchema::new("value", FieldType::Number),
//! ]);
//! frame.push(DataFrameMessage::new(
//!     schema,
//!     vec![vec![100.0.into(), 200.0.into()], vec![1.0.into(), 2.0.into()]],
//! ))?;
//!
//! // Later messages may omit the schema
//! frame.push(DataFrameMessage::values(vec![vec![500.0.into()], vec![5.0.into()]]))?;
//!
//! assert_eq!(frame.len(), 2);
//! assert_eq!(frame.fields()[0].values, [FieldValue::from(200.0), FieldValue::from(500.0)]);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::buffer::{apply_retention, circ_push, truncate_to_length};
use crate::error::{PushError, Result};
use crate::expand::expand_labeled_rows;
use crate::field::Field;
use crate::labels::{LabelSeriesRegistry, Labels, format_labels, render_display_name};
use crate::message::{DataFrameMessage, FrameData, check_rectangular};
use crate::options::{FrameAction, StreamingFrameOptions};
use crate::schema::{FieldConfig, FieldSchema, FrameMeta, FrameSchema, PushMode, SchemaLayout, has_same_structure};
use crate::value::{FieldValue, FieldValueEntities};

/// Config key the rendered series name is stored under.
pub const DISPLAY_NAME_KEY: &str = "displayNameFromDS";

/// Summary of the most recent push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketInfo {
    /// Number of pushes applied so far, including this one.
    pub number: u64,
    /// Whether the rows were appended or replaced the buffer.
    pub action: FrameAction,
    /// Number of rows this push added, after label expansion.
    pub length: usize,
    /// Whether the push rebuilt the columns from a new schema.
    pub schema_changed: bool,
}

/// An owned, serializable copy of a frame's current contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFrame {
    /// Frame name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Query reference identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Frame metadata.
    #[serde(default)]
    pub meta: FrameMeta,
    /// Columns with their values.
    pub fields: Vec<Field>,
    /// Row count.
    pub length: usize,
}

/// Transferable state of a frame, used to hand it across a process or
/// worker boundary and resume it with [`StreamingDataFrame::deserialize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStreamingFrame {
    /// Frame options.
    pub options: StreamingFrameOptions,
    /// Schema fields as last applied, labels column included. `None` for a
    /// frame that never received a schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_fields: Option<Vec<FieldSchema>>,
    /// Frame name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Query reference identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Frame metadata.
    #[serde(default)]
    pub meta: FrameMeta,
    /// Label sets of the known series, by ordinal.
    #[serde(default)]
    pub series: Vec<Labels>,
    /// Columns with their values. Non-finite numbers are written as `null`
    /// and restored from `entities`.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Non-finite cells per column, aligned with `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Option<FieldValueEntities>>>,
    /// Last push summary.
    #[serde(default)]
    pub packet_info: PacketInfo,
}

/// A bounded, columnar buffer fed by streamed messages.
///
/// # Thread Safety
///
/// The frame is a single-owner value. Every mutation takes `&mut self`, and
/// views are either borrows or owned copies, so no internal locking exists.
/// The frame is `Send` and may be moved to another thread by its owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingDataFrame {
    fields: Vec<Field>,
    name: Option<String>,
    ref_id: Option<String>,
    meta: FrameMeta,
    options: StreamingFrameOptions,
    /// Last applied schema fields, labels column included.
    schema: Option<Vec<FieldSchema>>,
    layout: SchemaLayout,
    registry: LabelSeriesRegistry,
    packet_info: PacketInfo,
}

impl StreamingDataFrame {
    /// Creates an empty frame with validated options.
    ///
    /// The frame has no columns until the first message with a schema.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`](crate::error::OptionsError) if the options are
    /// invalid.
    pub fn new(options: StreamingFrameOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::default()
        })
    }

    /// Creates an empty frame with default options.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Applies one message.
    ///
    /// # Errors
    ///
    /// - [`PushError::NotInitialized`] if the frame has no schema yet and the
    ///   message carries none, or one without fields
    /// - [`PushError::RaggedBatch`] if the value arrays differ in length
    /// - [`PushError::SchemaMismatch`] or [`PushError::MissingLabelsColumn`]
    ///   if the payload does not carry one array per expected column
    ///
    /// The frame is unchanged on error. A payload with no arrays at all is
    /// not a mismatch: it adds no rows and only bumps the packet info.
    pub fn push(&mut self, message: DataFrameMessage) -> Result<()> {
        let DataFrameMessage { schema, data } = message;

        if self.schema.is_none() && schema.as_ref().is_none_or(|s| s.fields.is_empty()) {
            return Err(PushError::NotInitialized.into());
        }

        let incoming = schema.map(|schema| {
            let layout = schema.layout();
            (schema, layout)
        });

        let mut data = data.filter(|data| !data.values.is_empty());
        if let Some(data) = data.as_mut() {
            let layout = incoming.as_ref().map_or(&self.layout, |(_, layout)| layout);
            validate_payload(layout, data)?;
        }

        let schema_changed = match incoming {
            Some((schema, layout)) => self.apply_schema(schema, layout),
            None => false,
        };

        let length = match data {
            Some(data) => self.append(data.values),
            None => 0,
        };

        self.packet_info = PacketInfo {
            number: self.packet_info.number + 1,
            action: self.options.action,
            length,
            schema_changed,
        };

        Ok(())
    }

    /// Pushes raw column-wise values without a message envelope.
    ///
    /// In labels mode `values` includes the labels array at its schema
    /// position, as in a message.
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn push_new_values(&mut self, values: Vec<Vec<FieldValue>>) -> Result<()> {
        self.push(DataFrameMessage::values(values))
    }

    /// Replaces the options and re-applies retention immediately.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`](crate::error::OptionsError) if the options are
    /// invalid; the frame is unchanged.
    pub fn set_options(&mut self, options: StreamingFrameOptions) -> Result<()> {
        options.validate()?;
        self.options = options;

        let time_index = self.time_index();
        let evicted = apply_retention(&mut self.fields, time_index, self.options.retention());
        if evicted > 0 {
            trace!(evicted, len = self.len(), "evicted rows after options change");
        }
        Ok(())
    }

    /// Columns in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column at `index`.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of buffered rows.
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, Field::len)
    }

    /// Returns `true` when no rows are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the primary time column, if the schema has one.
    pub fn time_index(&self) -> Option<usize> {
        self.layout.time_index()
    }

    /// How payload arrays map onto columns.
    pub fn push_mode(&self) -> PushMode {
        self.layout.mode
    }

    /// Frame name from the last schema.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Query reference identifier from the last schema.
    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    /// Metadata from the last schema.
    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    /// Current options.
    pub fn options(&self) -> &StreamingFrameOptions {
        &self.options
    }

    /// Summary of the last push.
    pub fn packet_info(&self) -> PacketInfo {
        self.packet_info
    }

    /// Label sets of the known series, by ordinal.
    pub fn series_labels(&self) -> &[Labels] {
        self.registry.series()
    }

    /// The values each column received in the last push, capped by what
    /// retention kept.
    pub fn values_from_last_packet(&self) -> Vec<Vec<FieldValue>> {
        let count = self.packet_info.length.min(self.len());
        self.fields
            .iter()
            .map(|field| field.values[field.len() - count..].to_vec())
            .collect()
    }

    /// Indexes of the columns `predicate` accepts.
    pub fn matching_field_indexes(&self, predicate: impl Fn(&Field) -> bool) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| predicate(field))
            .map(|(i, _)| i)
            .collect()
    }

    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> DataFrame {
        DataFrame {
            name: self.name.clone(),
            ref_id: self.ref_id.clone(),
            meta: self.meta.clone(),
            fields: self.fields.clone(),
            length: self.len(),
        }
    }

    /// Captures the frame's state, keeping at most the newest `trim` rows
    /// when given.
    pub fn serialize(&self, trim: Option<usize>) -> SerializedStreamingFrame {
        let mut fields = self.fields.clone();
        if let Some(max_length) = trim {
            truncate_to_length(&mut fields, max_length);
        }

        let entities: Vec<_> = fields.iter().map(|f| FieldValueEntities::encode(&f.values)).collect();
        let entities = entities.iter().any(Option::is_some).then_some(entities);

        SerializedStreamingFrame {
            options: self.options.clone(),
            schema_fields: self.schema.clone(),
            name: self.name.clone(),
            ref_id: self.ref_id.clone(),
            meta: self.meta.clone(),
            series: self.registry.series().to_vec(),
            fields,
            entities,
            packet_info: self.packet_info,
        }
    }

    /// Rebuilds a frame from state captured by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`](crate::error::OptionsError) for invalid
    /// options, [`PushError::SchemaMismatch`] if the column count does not
    /// fit the schema and series, and [`PushError::RaggedBatch`] if the
    /// columns differ in length.
    pub fn deserialize(serialized: SerializedStreamingFrame) -> Result<Self> {
        let SerializedStreamingFrame {
            options,
            schema_fields,
            name,
            ref_id,
            meta,
            series,
            mut fields,
            entities,
            packet_info,
        } = serialized;

        options.validate()?;

        let layout = schema_fields
            .as_ref()
            .map(|fields| FrameSchema::new(fields.clone()).layout())
            .unwrap_or_default();
        let registry = LabelSeriesRegistry::from_series(series);

        let expected = column_count(&layout, registry.len());
        if fields.len() != expected {
            return Err(PushError::SchemaMismatch {
                expected,
                received: fields.len(),
                labels: layout.mode == PushMode::Labels,
            }
            .into());
        }

        let expected_len = fields.first().map_or(0, Field::len);
        if let Some((column, field)) = fields.iter().enumerate().find(|(_, f)| f.len() != expected_len) {
            return Err(PushError::RaggedBatch {
                column,
                expected: expected_len,
                received: field.len(),
            }
            .into());
        }

        for (field, entities) in fields.iter_mut().zip(entities.unwrap_or_default()) {
            if let Some(entities) = entities {
                entities.decode(&mut field.values);
            }
        }

        Ok(Self {
            fields,
            name,
            ref_id,
            meta,
            options,
            schema: schema_fields,
            layout,
            registry,
            packet_info,
        })
    }

    /// Applies a schema and returns whether the columns were rebuilt.
    fn apply_schema(&mut self, schema: FrameSchema, layout: SchemaLayout) -> bool {
        let FrameSchema {
            name,
            ref_id,
            meta,
            fields,
        } = schema;

        self.name = name;
        self.ref_id = ref_id;
        self.meta = meta.unwrap_or_default();

        let changed = self
            .schema
            .as_deref()
            .is_none_or(|current| !has_same_structure(current, &fields));

        self.layout = layout;
        if changed {
            debug!(
                fields = fields.len(),
                mode = ?self.layout.mode,
                discarded = self.len(),
                "rebuilding columns from new schema"
            );
            self.fields = self.layout.base_fields.iter().map(Field::from_schema).collect();
            self.registry.clear();
        } else {
            self.refresh_field_metadata();
        }
        self.schema = Some(fields);

        changed
    }

    /// Copies display config and labels from the current layout onto the
    /// existing columns. Series columns keep their series labels.
    fn refresh_field_metadata(&mut self) {
        let base = &self.layout.base_fields;
        let format = self.options.display_name_format.as_deref();

        match self.layout.mode {
            PushMode::Wide => {
                for (field, schema) in self.fields.iter_mut().zip(base) {
                    field.config = schema.config.clone().unwrap_or_default();
                    field.labels = schema.labels.clone();
                }
            }
            PushMode::Labels => {
                let count = self.layout.value_field_count();
                for (i, field) in self.fields.iter_mut().enumerate() {
                    let source = if i == 0 || count == 0 { 0 } else { (i - 1) % count + 1 };
                    field.config = base[source].config.clone().unwrap_or_default();
                    if let (Some(format), Some(labels)) = (format, field.labels.as_ref()) {
                        set_display_name(&mut field.config, format, labels);
                    }
                }
            }
        }
    }

    /// Appends validated values and returns the number of rows added.
    fn append(&mut self, values: Vec<Vec<FieldValue>>) -> usize {
        let values = match self.layout.mode {
            PushMode::Wide => values,
            PushMode::Labels => self.expand(values),
        };
        let rows = values.first().map_or(0, Vec::len);
        let time_index = self.time_index();
        let retention = self.options.retention();

        let evicted = match self.options.action {
            FrameAction::Append => circ_push(&mut self.fields, values, time_index, retention),
            FrameAction::Replace => {
                for (field, values) in self.fields.iter_mut().zip(values) {
                    field.values = values;
                }
                truncate_to_length(&mut self.fields, retention.max_length)
            }
        };

        if evicted > 0 {
            trace!(evicted, len = self.len(), "evicted rows");
        }
        rows
    }

    /// Fans a labeled payload out into one column set per series, adding
    /// columns for series seen for the first time.
    fn expand(&mut self, mut values: Vec<Vec<FieldValue>>) -> Vec<Vec<FieldValue>> {
        let labels = values.remove(self.layout.labels_index.unwrap_or_default());
        let time_index = self.layout.payload_time_index.unwrap_or_default();

        let batch = expand_labeled_rows(&labels, values, time_index, &mut self.registry);
        for ordinal in batch.new_series {
            self.add_series_columns(ordinal);
        }

        let mut values = batch.values;
        // An empty registry still owns the unassigned value columns.
        values.resize_with(self.fields.len(), Vec::new);
        values
    }

    /// Gives series `ordinal` its columns, back-filled with placeholders for
    /// the rows already buffered. The first series takes over the value
    /// columns built from the schema.
    fn add_series_columns(&mut self, ordinal: usize) {
        let labels = self.registry.labels(ordinal).cloned().unwrap_or_default();
        let count = self.layout.value_field_count();
        let len = self.len();
        let format = self.options.display_name_format.as_deref();

        debug!(series = ordinal, labels = %format_labels(&labels), backfill = len, "new label series");

        if ordinal == 0 {
            for field in &mut self.fields[1..=count] {
                field.labels = Some(labels.clone());
                if let Some(format) = format {
                    set_display_name(&mut field.config, format, &labels);
                }
            }
            return;
        }

        for schema in &self.layout.base_fields[1..] {
            let mut field = Field::placeholder(schema, len);
            field.labels = Some(labels.clone());
            if let Some(format) = format {
                set_display_name(&mut field.config, format, &labels);
            }
            self.fields.push(field);
        }
    }
}

/// Checks a payload against `layout` and decodes its entities.
fn validate_payload(layout: &SchemaLayout, data: &mut FrameData) -> std::result::Result<(), PushError> {
    data.decode_entities();
    check_rectangular(&data.values)?;

    let received = data.values.len();
    match layout.mode {
        PushMode::Wide => {
            let expected = layout.base_fields.len();
            if received != expected {
                return Err(PushError::SchemaMismatch {
                    expected,
                    received,
                    labels: false,
                });
            }
        }
        PushMode::Labels => {
            let expected = layout.value_field_count() + 2;
            if received + 1 == expected {
                return Err(PushError::MissingLabelsColumn { expected, received });
            }
            if received != expected {
                return Err(PushError::SchemaMismatch {
                    expected,
                    received,
                    labels: true,
                });
            }
        }
    }
    Ok(())
}

/// Number of columns a frame holds for `layout` with `series` known series.
fn column_count(layout: &SchemaLayout, series: usize) -> usize {
    match layout.mode {
        PushMode::Wide => layout.base_fields.len(),
        PushMode::Labels => 1 + series.max(1) * layout.value_field_count(),
    }
}

fn set_display_name(config: &mut FieldConfig, format: &str, labels: &Labels) {
    let name = render_display_name(format, labels);
    config.insert(DISPLAY_NAME_KEY.to_string(), serde_json::Value::String(name));
}
