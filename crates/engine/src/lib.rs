//! Document store engine for folio
//!
//! This crate orchestrates the lower layers:
//! - Store: the embedded store with open/close and record CRUD
//! - Cache lifecycle: lazy loads, load coalescing, LRU residency
//! - Flush scheduling: the periodic write-back sweep and its worker pool
//! - Query evaluation over cached collections
//!
//! The engine is the only component that knows about:
//! - The flush thread and when sweeps run
//! - Cross-layer coordination (cache + disk + query)
//! - Shutdown ordering

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod config;
pub mod flush;
pub mod query;
pub mod store;

pub use config::FolioConfig;
pub use flush::SweepStats;
pub use folio_core::{Cond, Collection, Filter, FolioError, FolioResult, Value};
pub use folio_storage::CollectionIo;
pub use query::Cursor;
pub use store::{Store, StoreStats};
