//! Cache entries
//!
//! A [`CacheEntry`] owns one resident collection together with its
//! write-back state: the dirty flag, a monotonic last-access token, and
//! the neighbor links the [`LruRegistry`](crate::LruRegistry) threads
//! entries onto. The registry owns the links; nothing outside it touches
//! them.

use folio_core::Collection;

/// One resident collection with its write-back state.
#[derive(Debug)]
pub struct CacheEntry {
    pub(crate) id: String,
    pub(crate) collection: Collection,
    pub(crate) dirty: bool,
    pub(crate) last_access: u64,
    pub(crate) newer: Option<String>,
    pub(crate) older: Option<String>,
}

impl CacheEntry {
    /// Wrap a freshly loaded collection. Starts clean and unlinked.
    pub fn new(collection_id: impl Into<String>, collection: Collection) -> Self {
        CacheEntry {
            id: collection_id.into(),
            collection,
            dirty: false,
            last_access: 0,
            newer: None,
            older: None,
        }
    }

    /// The collection id this entry caches.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read access to the records.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Mutable access to the records.
    ///
    /// Mutating does not set the dirty flag; callers that change records
    /// must call [`set_dirty`](Self::set_dirty) themselves.
    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    /// Whether this entry has unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag or clear unflushed changes.
    ///
    /// The registry's dirty set is derived from this flag; the cache layer
    /// re-syncs it after running an operation against the entry.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Monotonic token of the most recent access (maintained by the registry).
    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    /// Consume the entry, returning the collection.
    pub fn into_collection(self) -> Collection {
        self.collection
    }
}
