//! # streamframe
//!
//! Bounded, append-only columnar buffer for live streaming query results.
//!
//! streamframe keeps the most recent rows of a streamed data frame in memory.
//! A producer pushes messages carrying an optional schema and a batch of
//! column-wise values; the frame appends them, evicts the oldest rows to stay
//! within a row count and a time span, and exposes the columns for rendering.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Row and time-span retention applied after every push
//! - Schema changes detected by structure; buffered values survive
//!   config-only updates
//! - Labeled payloads fanned out into one column set per label series, with
//!   gaps filled by a `Null` placeholder
//! - A failed push never leaves the frame partially updated
//!
//! ## Quick Start
//!
//! ```rust
//! use streamframe::{DataFrameMessage, FieldSchema, FieldType, FrameSchema};
//! use streamframe::{StreamingDataFrame, StreamingFrameOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Keep at most 1000 rows spanning at most one minute
//! let mut frame = StreamingDataFrame::new(StreamingFrameOptions::new(None, Some(60_000.0))?)?;
//!
//! // The labels column fans rows out per sensor
//! let schema = FrameSchema::new(vec![
//!     FieldSchema::new("labels", FieldType::String),
//!     FieldSchema::new("time", FieldType::Time),
//!     FieldSchema::new("speed", FieldType::Number),
//! ]);
//! frame.push(DataFrameMessage::new(schema, vec![
//!     vec!["sensor=A".into(), "sensor=B".into()],
//!     vec![1000.0.into(), 1000.0.into()],
//!     vec![10.0.into(), 15.0.into()],
//! ]))?;
//!
//! // time, speed{sensor=A}, speed{sensor=B}
//! assert_eq!(frame.fields().len(), 3);
//! assert_eq!(frame.len(), 1);
//!
//! let snapshot = frame.snapshot();
//! println!("{}", serde_json::to_string(&snapshot)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`StreamingDataFrame`]: Owns the columns; applies messages
//! - [`DataFrameMessage`]: One update: optional schema, optional rows
//! - [`StreamingFrameOptions`]: Retention bounds and push behavior
//! - [`Field`]: A named, typed column and its values
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`frame`]: The frame and its push path
//! - [`buffer`]: Append-and-evict engine
//! - [`expand`]: Fan-out of labeled rows into series columns
//! - [`labels`]: Label parsing and the series registry
//! - [`schema`]: Schema types and layout resolution
//! - [`message`]: Incoming message types
//! - [`options`]: Frame options
//! - [`field`]: Columns
//! - [`value`]: Cell values and entity markers
//! - [`error`]: Error types

pub mod buffer;
pub mod error;
pub mod expand;
pub mod field;
pub mod frame;
pub mod labels;
pub mod message;
pub mod options;
pub mod schema;
pub mod value;

// Re-export primary API types at crate root for convenience.
pub use error::{FrameError, LabelParseError, OptionsError, PushError, Result};
pub use field::Field;
pub use frame::{DataFrame, PacketInfo, SerializedStreamingFrame, StreamingDataFrame};
pub use labels::{LabelSeriesRegistry, Labels};
pub use message::{DataFrameMessage, FrameData};
pub use options::{FrameAction, StreamingFrameOptions};
pub use schema::{FieldSchema, FieldType, FrameSchema, PushMode};
pub use value::{FieldValue, FieldValueEntities};
