//! Query evaluation over cached collections.
//!
//! [`Store::find`](crate::Store::find) scans a collection's records in
//! insertion order and keeps the values matching a [`Filter`]. The cursor
//! variant wraps the same match sequence in a single-pass iterator.

use folio_core::{Collection, Filter, Value};

/// Collect the values of `collection` matching `filter`, in insertion order.
///
/// `None` matches every record.
pub(crate) fn scan(collection: &Collection, filter: Option<&Filter>) -> Vec<Value> {
    collection
        .values()
        .filter(|value| filter.map(|f| f.matches(value)).unwrap_or(true))
        .cloned()
        .collect()
}

/// Single-pass iterator over a query's matched values.
///
/// The matches are snapshotted when the query runs; mutations made to the
/// collection afterwards do not show up. Once exhausted the cursor stays
/// exhausted — it cannot be rewound.
///
/// # Example
///
/// ```
/// use folio_engine::{Cursor, Value};
///
/// let mut cursor = Cursor::new(vec![Value::from(1), Value::from(2)]);
/// assert_eq!(cursor.next(), Some(Value::from(1)));
/// assert_eq!(cursor.next(), Some(Value::from(2)));
/// assert_eq!(cursor.next(), None);
/// assert_eq!(cursor.next(), None);
/// ```
#[derive(Debug)]
pub struct Cursor {
    matches: std::vec::IntoIter<Value>,
    remaining: usize,
}

impl Cursor {
    /// Wrap a snapshot of matched values.
    pub fn new(matches: Vec<Value>) -> Self {
        let remaining = matches.len();
        Cursor {
            matches: matches.into_iter(),
            remaining,
        }
    }

    /// Number of matches not yet yielded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Whether every match has been yielded.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

impl Iterator for Cursor {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let next = self.matches.next();
        if next.is_some() {
            self.remaining -= 1;
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
