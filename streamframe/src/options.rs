//! Retention and behavior options for a streaming frame.
//!
//! Options are chosen when a frame is created and may be replaced later with
//! [`StreamingDataFrame::set_options`](crate::frame::StreamingDataFrame::set_options),
//! which re-applies retention immediately.

use serde::{Deserialize, Serialize};

use crate::buffer::Retention;
use crate::error::{OptionsError, Result};

/// Row bound used when none is configured.
pub const DEFAULT_MAX_LENGTH: usize = 1000;

/// What a data payload does to the buffered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameAction {
    /// Append the new rows, then evict old ones.
    #[default]
    Append,
    /// Replace all buffered rows with the new ones.
    Replace,
}

/// Options controlling retention and column naming.
///
/// # Example
///
/// ```rust
/// use streamframe::options::{FrameAction, StreamingFrameOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Keep at most 500 rows spanning at most five minutes
/// let options = StreamingFrameOptions::new(Some(500), Some(300_000.0))?
///     .with_display_name_format("{{host}}");
/// assert_eq!(options.action, FrameAction::Append);
///
/// // Options also load from JSON; missing keys take their defaults
/// let options: StreamingFrameOptions = serde_json::from_str(r#"{"maxDelta": 60000}"#)?;
/// assert_eq!(options.max_length, 1000);
/// assert_eq!(options.max_delta, 60_000.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingFrameOptions {
    /// Maximum number of rows kept. Must be positive.
    pub max_length: usize,

    /// Maximum span, in the time column's unit (milliseconds), between the
    /// newest and oldest kept row. `f64::INFINITY` disables the bound.
    ///
    /// Serialized as `null` when infinite, since JSON has no infinity.
    #[serde(with = "delta_serde")]
    pub max_delta: f64,

    /// Whether data payloads append or replace.
    pub action: FrameAction,

    /// Legend template rendered against each label series, e.g. `"{{host}}"`.
    /// The result is stored as `displayNameFromDS` in the series columns'
    /// display config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name_format: Option<String>,
}

impl Default for StreamingFrameOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            max_delta: f64::INFINITY,
            action: FrameAction::Append,
            display_name_format: None,
        }
    }
}

impl StreamingFrameOptions {
    /// Creates validated options; `None` takes the default bound.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] if `max_length` is zero or `max_delta` is
    /// negative or NaN.
    pub fn new(max_length: Option<usize>, max_delta: Option<f64>) -> Result<Self> {
        let options = Self {
            max_length: max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            max_delta: max_delta.unwrap_or(f64::INFINITY),
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    /// Sets the push action.
    #[must_use]
    pub fn with_action(mut self, action: FrameAction) -> Self {
        self.action = action;
        self
    }

    /// Sets the legend template for label series.
    #[must_use]
    pub fn with_display_name_format(mut self, format: impl Into<String>) -> Self {
        self.display_name_format = Some(format.into());
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(OptionsError::InvalidMaxLength {
                max_length: self.max_length,
            }
            .into());
        }

        if self.max_delta.is_nan() || self.max_delta < 0.0 {
            return Err(OptionsError::InvalidMaxDelta {
                max_delta: self.max_delta,
            }
            .into());
        }

        Ok(())
    }

    /// The retention bounds these options describe.
    pub fn retention(&self) -> Retention {
        Retention {
            max_length: self.max_length,
            max_delta: self.max_delta,
        }
    }
}

/// Serde support for the time bound: infinite is written as `null`, and both
/// `null` and a missing key read back as infinite.
mod delta_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(delta: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let finite = delta.is_finite().then_some(*delta);
        finite.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let delta = Option::<f64>::deserialize(deserializer)?;
        Ok(delta.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    #[test]
    fn test_defaults() {
        let options = StreamingFrameOptions::default();
        assert_eq!(options.max_length, DEFAULT_MAX_LENGTH);
        assert!(options.max_delta.is_infinite());
        assert_eq!(options.action, FrameAction::Append);
        assert!(options.display_name_format.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_new_validates() {
        assert!(StreamingFrameOptions::new(Some(5), Some(300.0)).is_ok());
        assert!(StreamingFrameOptions::new(None, Some(0.0)).is_ok());

        assert!(matches!(
            StreamingFrameOptions::new(Some(0), None),
            Err(FrameError::Options(OptionsError::InvalidMaxLength { .. }))
        ));
        assert!(matches!(
            StreamingFrameOptions::new(None, Some(-1.0)),
            Err(FrameError::Options(OptionsError::InvalidMaxDelta { .. }))
        ));
        assert!(matches!(
            StreamingFrameOptions::new(None, Some(f64::NAN)),
            Err(FrameError::Options(OptionsError::InvalidMaxDelta { .. }))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let options = StreamingFrameOptions::new(Some(10), None)
            .unwrap()
            .with_action(FrameAction::Replace)
            .with_display_name_format("{{host}}");

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "maxLength": 10,
                "maxDelta": null,
                "action": "replace",
                "displayNameFormat": "{{host}}"
            })
        );

        let back: StreamingFrameOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_json_defaults_for_missing_keys() {
        let options: StreamingFrameOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, StreamingFrameOptions::default());
    }

    #[test]
    fn test_retention() {
        let retention = StreamingFrameOptions::new(Some(7), Some(42.0))
            .unwrap()
            .retention();
        assert_eq!(retention.max_length, 7);
        assert_eq!(retention.max_delta, 42.0);
    }
}
