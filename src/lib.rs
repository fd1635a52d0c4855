//! FolioDB - embedded file-backed document store
//!
//! FolioDB keeps named collections of JSON records in one file per
//! collection, front-ended by a bounded in-memory cache with write-back
//! flushing. Collections load lazily, concurrent cold reads share a single
//! disk read, and a background thread persists dirty collections on an
//! interval.
//!
//! # Quick Start
//!
//! ```no_run
//! use foliodb::{Filter, Store};
//! use serde_json::json;
//!
//! # fn main() -> foliodb::FolioResult<()> {
//! let store = Store::open("db")?;
//!
//! // Store a record (marks the collection dirty in memory)
//! store.save("people", "ada", json!({"name": "Ada", "age": 36}))?;
//!
//! // Read it back
//! let ada = store.find_by_id("people", "ada")?;
//!
//! // Query with dotted paths and operators
//! let adults = store.find("people", Some(&Filter::new().gte("age", 18)))?;
//!
//! // Persist everything now instead of waiting for the flush timer
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! All operations go through the [`Store`], which owns the cache, the
//! load coalescer, and the flush scheduler. Internal layers (core types,
//! file storage) are not exposed separately; the engine API is the public
//! surface.

// Re-export the public API from folio-engine
pub use folio_engine::*;
