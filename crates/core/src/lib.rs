//! Core types for foliodb
//!
//! This crate defines the foundational types shared by the storage and
//! engine layers:
//! - Collection: a named, insertion-ordered mapping of record keys to values
//! - FolioError / FolioResult: error type hierarchy
//! - FieldPath: dotted-path lookup into JSON values
//! - Filter / Cond: query predicates (equality, range, membership)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod filter;
pub mod path;

pub use error::{FolioError, FolioResult};
pub use filter::{Cond, Filter};
pub use path::FieldPath;

/// Record values are arbitrary JSON.
pub use serde_json::Value;

/// A collection is a flat mapping of record keys to JSON values.
///
/// Backed by `serde_json::Map` with the `preserve_order` feature, so
/// iteration visits records in insertion order. Persisted 1:1 as a single
/// pretty-printed JSON object file.
pub type Collection = serde_json::Map<String, Value>;
