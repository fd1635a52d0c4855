//! Dotted field paths into JSON values
//!
//! Query filters address record fields with dotted paths like
//! `"profile.address.city"` or `"tags.0"`. A path descends object fields by
//! name and array elements by numeric segment. Resolution is total: any
//! segment that cannot be traversed (missing field, out-of-range index,
//! scalar in the middle of the path) yields `None`, never an error.

use serde_json::Value;
use std::fmt;

/// A parsed dotted path into a JSON document.
///
/// # Example
///
/// ```
/// use folio_core::FieldPath;
/// use serde_json::json;
///
/// let record = json!({"profile": {"age": 34, "tags": ["a", "b"]}});
/// let path = FieldPath::parse("profile.age");
/// assert_eq!(path.resolve(&record), Some(&json!(34)));
///
/// let path = FieldPath::parse("profile.tags.1");
/// assert_eq!(path.resolve(&record), Some(&json!("b")));
///
/// assert_eq!(FieldPath::parse("profile.missing").resolve(&record), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path.
    ///
    /// Splitting is purely syntactic and never fails. `"a.b"` produces two
    /// segments; a bare name produces one. Empty segments (from `"a..b"` or
    /// a leading/trailing dot) are kept as-is and only match a literal
    /// empty-string field name.
    pub fn parse(raw: &str) -> Self {
        FieldPath {
            segments: raw.split('.').map(str::to_string).collect(),
        }
    }

    /// The path's segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk this path down from `root`.
    ///
    /// Objects are descended by field name. Arrays are descended by numeric
    /// segment (`"0"`, `"1"`, ...). A segment that is not a valid index, an
    /// index past the end, a missing field, or any non-container value in
    /// the middle of the path resolves to `None`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        FieldPath::parse(raw)
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        FieldPath::parse(&raw)
    }
}
