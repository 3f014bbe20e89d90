//! Cell values and the entity markers used to carry non-JSON numbers.
//!
//! JSON has no encoding for `NaN`, `Infinity`, `-Infinity` or an undefined
//! cell, so a sender replaces those cells with `null` and lists their row
//! indexes in a [`FieldValueEntities`] record next to the value array. The
//! record is applied with [`FieldValueEntities::decode`] before the values
//! reach the frame, and built with [`FieldValueEntities::encode`] when a
//! frame's state is written back out.

use serde::{Deserialize, Serialize};

/// A single cell in a column.
///
/// `Null` doubles as the gap-fill placeholder written into a label-series
/// column for rows where that series reported nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Numeric cell; also the representation of time values (epoch milliseconds).
    Number(f64),
    /// String cell.
    Text(String),
    /// Any other JSON value, passed through untouched.
    Other(serde_json::Value),
}

impl FieldValue {
    /// Returns the numeric value, if this cell holds a number.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if this cell holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean value, if this cell holds one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns `true` for the `Null` placeholder.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Row indexes of cells that JSON could not carry directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValueEntities {
    /// Rows holding `NaN`.
    #[serde(rename = "NaN", default, skip_serializing_if = "Option::is_none")]
    pub nan: Option<Vec<usize>>,
    /// Rows holding an undefined value.
    #[serde(rename = "Undef", default, skip_serializing_if = "Option::is_none")]
    pub undef: Option<Vec<usize>>,
    /// Rows holding positive infinity.
    #[serde(rename = "Inf", default, skip_serializing_if = "Option::is_none")]
    pub inf: Option<Vec<usize>>,
    /// Rows holding negative infinity.
    #[serde(rename = "NegInf", default, skip_serializing_if = "Option::is_none")]
    pub neg_inf: Option<Vec<usize>>,
}

impl FieldValueEntities {
    /// Rewrites the listed cells of `values` in place.
    ///
    /// Indexes past the end of `values` are ignored.
    pub fn decode(&self, values: &mut [FieldValue]) {
        let replacements = [
            (&self.nan, FieldValue::Number(f64::NAN)),
            (&self.undef, FieldValue::Null),
            (&self.inf, FieldValue::Number(f64::INFINITY)),
            (&self.neg_inf, FieldValue::Number(f64::NEG_INFINITY)),
        ];

        for (rows, replacement) in replacements {
            let Some(rows) = rows else { continue };
            for &row in rows {
                if let Some(cell) = values.get_mut(row) {
                    *cell = replacement.clone();
                }
            }
        }
    }

    /// Lists the non-finite numbers in `values`. Returns `None` when there
    /// are none.
    ///
    /// `Null` cells are not listed; they survive JSON as they are.
    pub fn encode(values: &[FieldValue]) -> Option<Self> {
        let mut entities = Self::default();

        for (row, value) in values.iter().enumerate() {
            let rows = match value {
                FieldValue::Number(n) if n.is_nan() => &mut entities.nan,
                FieldValue::Number(n) if n.is_infinite() && n.is_sign_positive() => &mut entities.inf,
                FieldValue::Number(n) if n.is_infinite() => &mut entities.neg_inf,
                _ => continue,
            };
            rows.get_or_insert_with(Vec::new).push(row);
        }

        (!entities.is_empty()).then_some(entities)
    }

    /// Returns `true` when no rows are listed.
    pub fn is_empty(&self) -> bool {
        [&self.nan, &self.undef, &self.inf, &self.neg_inf]
            .iter()
            .all(|rows| rows.as_ref().is_none_or(Vec::is_empty))
    }
}
