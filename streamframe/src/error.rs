//! Error types for the streamframe buffer.

use thiserror::Error;

/// The main error type for all streamframe operations.
///
/// Every fatal condition is reported before the frame is mutated, so a
/// returned error always leaves the frame exactly as it was.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Error while applying a pushed message or raw values.
    #[error("push error: {0}")]
    Push(#[from] PushError),

    /// Error validating frame options.
    #[error("options error: {0}")]
    Options(#[from] OptionsError),

    /// Error parsing a serialized label set.
    #[error("label error: {0}")]
    Labels(#[from] LabelParseError),

    /// Error encoding or decoding a frame or message as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the push path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// Data arrived before a schema with at least one field was applied.
    #[error("frame has no schema; the first message must carry one with fields")]
    NotInitialized,

    /// The number of value arrays does not match the frame's column count.
    #[error("push message mismatch: expected {expected} value arrays, received {received} (labels={labels})")]
    SchemaMismatch {
        /// Column count the frame expected.
        expected: usize,
        /// Number of value arrays in the payload.
        received: usize,
        /// Whether the frame was in labels push mode.
        labels: bool,
    },

    /// The value arrays of one payload have different lengths.
    #[error("value array {column} has {received} rows, expected {expected}")]
    RaggedBatch {
        /// Index of the offending value array.
        column: usize,
        /// Row count of the first value array.
        expected: usize,
        /// Row count of the offending value array.
        received: usize,
    },

    /// A labels-mode payload arrived without its labels column.
    #[error("labels column missing from payload: expected {expected} value arrays, received {received}")]
    MissingLabelsColumn {
        /// Array count a labels payload must carry.
        expected: usize,
        /// Number of value arrays in the payload.
        received: usize,
    },
}

/// Errors raised when validating [`StreamingFrameOptions`](crate::options::StreamingFrameOptions).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// `max_length` must be a positive row count.
    #[error("invalid max_length: {max_length} (must be > 0)")]
    InvalidMaxLength {
        /// The rejected value.
        max_length: usize,
    },

    /// `max_delta` must be a non-negative number.
    #[error("invalid max_delta: {max_delta} (must be >= 0 and not NaN)")]
    InvalidMaxDelta {
        /// The rejected value.
        max_delta: f64,
    },
}

/// Errors raised when a labels cell cannot be parsed into a label set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelParseError {
    /// A `key=value` pair has no `=`.
    #[error("label pair '{pair}' has no '=' separator")]
    MissingSeparator {
        /// The offending pair.
        pair: String,
    },

    /// A pair has an empty key.
    #[error("label pair '{pair}' has an empty key")]
    EmptyKey {
        /// The offending pair.
        pair: String,
    },

    /// A quoted value was not closed.
    #[error("unterminated quoted value in '{input}'")]
    UnterminatedQuote {
        /// The whole labels string.
        input: String,
    },

    /// The labels cell was not a string.
    #[error("labels cell is not a string: {value}")]
    NotAString {
        /// Debug rendering of the cell.
        value: String,
    },
}

/// Type alias for `Result<T, FrameError>`.
pub type Result<T> = std::result::Result<T, FrameError>;
