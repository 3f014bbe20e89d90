//! Fan-out of labeled rows into per-series columns.
//!
//! In labels mode a payload multiplexes several series onto one set of
//! arrays: `[labels, <schema fields...>]`. This module turns such a payload
//! into the frame's wide layout, `[time, s0f0, s0f1, .., s1f0, ..]`, with one
//! column per (series, value field) pair.
//!
//! # Alignment
//!
//! Rows of different series are outer-joined on their time value. The
//! output time column holds the distinct times of the batch in ascending
//! order, and every known series column receives exactly one cell per output
//! row: the reported value, or [`FieldValue::Null`] when that series did not
//! report at that time. Series known from earlier batches but absent from
//! this one are filled entirely with `Null`. When one series reports the
//! same time twice, the later row wins.

use tracing::warn;

use crate::labels::{LabelSeriesRegistry, parse_labels_cell};
use crate::value::FieldValue;

/// Result of expanding one labeled payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedBatch {
    /// Expanded arrays: time first, then value fields series by series,
    /// covering every series in the registry.
    pub values: Vec<Vec<FieldValue>>,

    /// Ordinals of series registered while expanding, in registration order.
    pub new_series: Vec<usize>,

    /// Rows dropped because their labels could not be parsed or they had no
    /// numeric time value.
    pub skipped_rows: usize,
}

/// Expands a labeled payload.
///
/// `labels` is the payload's labels array. `rows` holds the remaining
/// arrays in schema order, with the time array at `time_index`; every other
/// array is a value field. All arrays must have the same length and
/// `time_index` must be in bounds; the frame checks both before calling.
///
/// Unseen label sets are registered in `registry`. Malformed label cells
/// are skipped row by row and do not fail the batch.
///
/// # Examples
///
/// ```rust
/// use streamframe::expand::expand_labeled_rows;
/// use streamframe::labels::LabelSeriesRegistry;
/// use streamframe::FieldValue;
///
/// let mut registry = LabelSeriesRegistry::new();
/// let labels: Vec<FieldValue> = vec!["sensor=A".into(), "sensor=B".into()];
/// let rows = vec![vec![100.0.into(), 100.0.into()], vec![10.0.into(), 15.0.into()]];
///
/// let batch = expand_labeled_rows(&labels, rows, 0, &mut registry);
/// assert_eq!(batch.new_series, [0, 1]);
/// let time = FieldValue::from(100.0);
/// assert_eq!(batch.values, [vec![time], vec![FieldValue::from(10.0)], vec![FieldValue::from(15.0)]]);
/// ```
pub fn expand_labeled_rows(
    labels: &[FieldValue],
    mut rows: Vec<Vec<FieldValue>>,
    time_index: usize,
    registry: &mut LabelSeriesRegistry,
) -> ExpandedBatch {
    let value_indexes: Vec<usize> = (0..rows.len()).filter(|&i| i != time_index).collect();
    let value_count = value_indexes.len();

    let mut new_series = Vec::new();
    let mut skipped_rows = 0;
    let mut tagged: Vec<(usize, f64, usize)> = Vec::with_capacity(labels.len());

    for (row, cell) in labels.iter().enumerate() {
        let parsed = match parse_labels_cell(cell) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(row, error = %e, "skipping row with malformed labels");
                skipped_rows += 1;
                continue;
            }
        };

        let Some(time) = rows[time_index][row].as_f64().filter(|t| !t.is_nan()) else {
            warn!(row, "skipping labeled row without a numeric time value");
            skipped_rows += 1;
            continue;
        };

        let (ordinal, created) = registry.register(parsed);
        if created {
            new_series.push(ordinal);
        }
        tagged.push((ordinal, time, row));
    }

    let mut times: Vec<f64> = tagged.iter().map(|&(_, time, _)| time).collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    let mut values = Vec::with_capacity(1 + registry.len() * value_count);
    values.push(times.iter().copied().map(FieldValue::Number).collect());
    values.extend((0..registry.len() * value_count).map(|_| vec![FieldValue::Null; times.len()]));

    for (ordinal, time, row) in tagged {
        let slot = times.partition_point(|&t| t < time);
        for (j, &source) in value_indexes.iter().enumerate() {
            values[1 + ordinal * value_count + j][slot] = std::mem::take(&mut rows[source][row]);
        }
    }

    ExpandedBatch {
        values,
        new_series,
        skipped_rows,
    }
}
