//! Append-and-evict engine for columnar value buffers.
//!
//! This module holds the retention algorithm shared by every push path. New
//! rows are appended to all columns in lockstep, then a common prefix of the
//! oldest rows is drained from every column so the frame stays within its
//! retention bounds.
//!
//! # Design
//!
//! - Append: each column's buffer is extended with its new values; the
//!   engine never sorts, it trusts rows to arrive in time order
//! - Trim by length: `len - max_length` rows when the buffer is too long
//! - Trim by time: when `newest - time[trim] > max_delta`, a binary search
//!   over the time column finds the boundary row closest to
//!   `newest - max_delta`
//! - The larger of the two candidates wins, and the same prefix is drained
//!   from every column, which is what keeps column lengths equal

use crate::value::FieldValue;

/// Retention bounds applied after every append.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    /// Maximum number of rows kept.
    pub max_length: usize,
    /// Maximum span between the newest and the oldest kept time value.
    /// `f64::INFINITY` disables time-based trimming.
    pub max_delta: f64,
}

impl Retention {
    /// Retention that never trims.
    pub const UNBOUNDED: Self = Self {
        max_length: usize::MAX,
        max_delta: f64::INFINITY,
    };
}

/// A column that owns a growable buffer of values.
///
/// Implemented by plain `Vec<FieldValue>` buffers and by
/// [`Field`](crate::field::Field), so the engine can run on frame columns
/// directly without copying them out.
pub trait ValueBuffer {
    /// The buffered values.
    fn values(&self) -> &[FieldValue];

    /// Mutable access to the buffer.
    fn values_mut(&mut self) -> &mut Vec<FieldValue>;
}

impl ValueBuffer for Vec<FieldValue> {
    fn values(&self) -> &[FieldValue] {
        self
    }

    fn values_mut(&mut self) -> &mut Vec<FieldValue> {
        self
    }
}

/// Appends `new_values` to `columns` and trims the result to `retention`.
///
/// `new_values` must hold one array per column, all of equal length; the
/// caller validates this before calling. `time_index` selects the column
/// used for time-based trimming; `None` disables it.
///
/// Returns the number of rows evicted from the front of every column.
///
/// # Examples
///
/// ```rust
/// use streamframe::buffer::{circ_push, Retention};
/// use streamframe::FieldValue;
///
/// let mut columns = vec![vec![FieldValue::from(100.0), FieldValue::from(200.0)]];
/// let retention = Retention { max_length: 5, max_delta: 100.0 };
///
/// let evicted = circ_push(&mut columns, vec![vec![FieldValue::from(300.0)]], Some(0), retention);
/// assert_eq!(evicted, 1);
/// assert_eq!(columns[0], vec![FieldValue::from(200.0), FieldValue::from(300.0)]);
/// ```
pub fn circ_push<C: ValueBuffer>(
    columns: &mut [C],
    new_values: Vec<Vec<FieldValue>>,
    time_index: Option<usize>,
    retention: Retention,
) -> usize {
    debug_assert_eq!(columns.len(), new_values.len());

    for (column, values) in columns.iter_mut().zip(new_values) {
        column.values_mut().extend(values);
    }

    apply_retention(columns, time_index, retention)
}

/// Trims `columns` to `retention` without appending anything.
///
/// Returns the number of rows evicted.
pub fn apply_retention<C: ValueBuffer>(
    columns: &mut [C],
    time_index: Option<usize>,
    retention: Retention,
) -> usize {
    let trim = trim_index(columns, time_index, retention);
    drain_front(columns, trim);
    trim
}

/// Computes how many leading rows must go to satisfy `retention`.
pub fn trim_index<C: ValueBuffer>(
    columns: &[C],
    time_index: Option<usize>,
    retention: Retention,
) -> usize {
    let Some(first) = columns.first() else {
        return 0;
    };
    let len = first.values().len();
    if len == 0 {
        return 0;
    }

    let mut trim = len.saturating_sub(retention.max_length);

    if retention.max_delta.is_finite()
        && let Some(times) = time_index.and_then(|i| columns.get(i)).map(ValueBuffer::values)
        && trim < len
    {
        let low = time_at(times, trim);
        let high = time_at(times, len - 1);
        if high - low > retention.max_delta {
            let boundary = closest_by(high - retention.max_delta, trim, len - 1, |i| {
                time_at(times, i)
            });
            trim = trim.max(boundary);
        }
    }

    trim
}

/// Keeps only the newest `max_length` rows. Returns the number of rows removed.
pub fn truncate_to_length<C: ValueBuffer>(columns: &mut [C], max_length: usize) -> usize {
    let len = columns.first().map_or(0, |c| c.values().len());
    let trim = len.saturating_sub(max_length);
    drain_front(columns, trim);
    trim
}

/// Binary search for the index in `times[lo..]` whose value is closest to
/// `target`.
///
/// The search narrows to two adjacent candidates `lo`/`hi` with
/// `times[lo] < target <= times[hi]` and returns the one numerically closer
/// to `target`; a tie goes to `lo`. `times` must be sorted ascending and
/// `lo` must be a valid index.
///
/// # Panics
///
/// Panics if `times` is empty or `lo` is out of bounds.
///
/// # Examples
///
/// ```rust
/// use streamframe::buffer::closest_idx;
///
/// let times = [100.0, 200.0, 300.0, 400.0, 500.0];
/// assert_eq!(closest_idx(200.0, &times, 0), 1);
/// assert_eq!(closest_idx(240.0, &times, 0), 1);
/// assert_eq!(closest_idx(250.0, &times, 0), 1);
/// assert_eq!(closest_idx(260.0, &times, 0), 2);
/// ```
pub fn closest_idx(target: f64, times: &[f64], lo: usize) -> usize {
    assert!(lo < times.len(), "lo {lo} out of bounds for {} times", times.len());
    closest_by(target, lo, times.len() - 1, |i| times[i])
}

fn closest_by(target: f64, mut lo: usize, mut hi: usize, at: impl Fn(usize) -> f64) -> usize {
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if at(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    if target - at(lo) <= at(hi) - target {
        lo
    } else {
        hi
    }
}

/// Reads a time cell. Non-numeric cells read as NaN, which never compares
/// less than anything, so the search errs towards trimming less.
#[inline]
fn time_at(times: &[FieldValue], i: usize) -> f64 {
    times[i].as_f64().unwrap_or(f64::NAN)
}

fn drain_front<C: ValueBuffer>(columns: &mut [C], trim: usize) {
    if trim == 0 {
        return;
    }
    for column in columns {
        column.values_mut().drain(..trim);
    }
}
