//! Label sets and the label-series registry.
//!
//! When a frame streams in labels mode, every row carries a serialized label
//! set (`sensor=A`, `{host="web1", dc="east"}` or a JSON object). Each
//! distinct set becomes one *series*, and each series owns one column per
//! value field of the schema.
//!
//! # Overview
//!
//! - [`Labels`] - Normalized, order-independent label set
//! - [`parse_labels`] - Parses a labels cell into a [`Labels`]
//! - [`LabelSeriesRegistry`] - Maps label sets to series ordinals
//!
//! Series ordinals are dense and never reused: the first label set seen is
//! series 0, the next new one series 1, and so on for the life of the frame.
//! The frame turns an ordinal into column indexes arithmetically, so the
//! registry never holds references into the column list.

use std::collections::{BTreeMap, HashMap};

use crate::error::LabelParseError;
use crate::value::FieldValue;

/// A label set. `BTreeMap` keeps keys sorted so equal sets hash equally
/// regardless of the order they were written in.
pub type Labels = BTreeMap<String, String>;

/// Parses a serialized label set.
///
/// Accepted forms:
///
/// - `""` - the empty label set
/// - a JSON object of string values: `{"host":"web1"}`
/// - Prometheus style: `{host="web1", dc="east"}`
/// - bare pairs: `host=web1,dc=east`
///
/// # Errors
///
/// Returns [`LabelParseError`] when a pair has no `=`, has an empty key, or a
/// quoted value is never closed.
///
/// # Examples
///
/// ```rust
/// use streamframe::labels::parse_labels;
///
/// let labels = parse_labels(r#"{host="web1", dc="east"}"#).unwrap();
/// assert_eq!(labels["host"], "web1");
/// assert_eq!(labels["dc"], "east");
///
/// assert_eq!(parse_labels("sensor=A").unwrap()["sensor"], "A");
/// assert!(parse_labels("sensor").is_err());
/// ```
pub fn parse_labels(input: &str) -> Result<Labels, LabelParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Labels::new());
    }

    if trimmed.starts_with('{')
        && let Ok(labels) = serde_json::from_str::<Labels>(trimmed)
    {
        return Ok(labels);
    }

    let body = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut labels = Labels::new();
    for pair in split_pairs(body, input)? {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let Some((key, value)) = pair.split_once('=') else {
            return Err(LabelParseError::MissingSeparator {
                pair: pair.to_string(),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(LabelParseError::EmptyKey {
                pair: pair.to_string(),
            });
        }

        labels.insert(key.to_string(), unquote(value.trim()));
    }

    Ok(labels)
}

/// Parses the labels cell of one row.
///
/// `Null` is read as the empty label set.
///
/// # Errors
///
/// Returns [`LabelParseError::NotAString`] for non-string cells, or any error
/// from [`parse_labels`].
pub fn parse_labels_cell(cell: &FieldValue) -> Result<Labels, LabelParseError> {
    match cell {
        FieldValue::Text(s) => parse_labels(s),
        FieldValue::Null => Ok(Labels::new()),
        other => Err(LabelParseError::NotAString {
            value: format!("{other:?}"),
        }),
    }
}

/// Splits on commas that are not inside a double-quoted value.
fn split_pairs(body: &str, input: &str) -> Result<Vec<String>, LabelParseError> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in body.chars() {
        if in_quotes {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                current.push(c);
            }
            ',' => pairs.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(LabelParseError::UnterminatedQuote {
            input: input.to_string(),
        });
    }

    pairs.push(current);
    Ok(pairs)
}

/// Strips surrounding double quotes and resolves `\"`, `\\` and `\n`.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Formats a label set in Prometheus style, e.g. `{dc="east", host="web1"}`.
pub fn format_labels(labels: &Labels) -> String {
    let pairs: Vec<_> = labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Renders a legend template such as `"{{sensor}} speed"` against a label set.
///
/// Unknown keys render as empty strings. An unclosed `{{` is copied verbatim.
///
/// # Examples
///
/// ```rust
/// use streamframe::labels::{parse_labels, render_display_name};
///
/// let labels = parse_labels("sensor=A,room=lab").unwrap();
/// assert_eq!(render_display_name("{{ sensor }} in {{room}}", &labels), "A in lab");
/// ```
pub fn render_display_name(template: &str, labels: &Labels) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        if let Some(value) = labels.get(key) {
            out.push_str(value);
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Registry of label series seen by a frame.
///
/// Label sets are normalized by [`Labels`] ordering, so `a=1,b=2` and
/// `b=2,a=1` are the same series.
///
/// # Thread Safety
///
/// The registry is owned by a single frame and is not synchronized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSeriesRegistry {
    /// Map from label set to series ordinal.
    index: HashMap<Labels, usize>,
    /// Label sets in registration order.
    series: Vec<Labels>,
}

impl LabelSeriesRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from label sets in registration order.
    ///
    /// Duplicate sets keep their first ordinal.
    pub fn from_series(series: Vec<Labels>) -> Self {
        let mut registry = Self::new();
        for labels in series {
            registry.register(labels);
        }
        registry
    }

    /// Returns the ordinal of a label set, registering it if unseen.
    ///
    /// The boolean is `true` when the set was newly registered.
    pub fn register(&mut self, labels: Labels) -> (usize, bool) {
        if let Some(&ordinal) = self.index.get(&labels) {
            return (ordinal, false);
        }

        let ordinal = self.series.len();
        self.index.insert(labels.clone(), ordinal);
        self.series.push(labels);
        (ordinal, true)
    }

    /// Looks up the ordinal of a label set.
    pub fn get(&self, labels: &Labels) -> Option<usize> {
        self.index.get(labels).copied()
    }

    /// Returns the label set registered under `ordinal`.
    pub fn labels(&self, ordinal: usize) -> Option<&Labels> {
        self.series.get(ordinal)
    }

    /// Label sets in registration order.
    pub fn series(&self) -> &[Labels] {
        &self.series
    }

    /// Number of registered series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns `true` if no series has been registered.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Forgets every series.
    pub fn clear(&mut self) {
        self.index.clear();
        self.series.clear();
    }
}
