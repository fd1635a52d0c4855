//! Integration Tests
//!
//! Cross-layer tests organized by behavior:
//! - Round trip: save/read/remove across restarts
//! - Queries: filters, dotted paths, cursors
//! - Cache: eviction, recency, reload transparency
//! - Flush: timer sweeps, manual sweeps, on-disk format
//! - Coalescing: one disk read under concurrent cold access
//! - Concurrency: multi-threaded operation mixes
//! - Config: folio.toml handling

#[path = "../common/mod.rs"]
mod common;

mod coalescing;
mod concurrency;
mod flush_behavior;
