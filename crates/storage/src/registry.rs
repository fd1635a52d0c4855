//! Bounded LRU registry of cached collections
//!
//! Maintains mappings from:
//! - collection id -> CacheEntry (FxHashMap)
//! - recency order via a key-linked list (`newest`/`oldest` plus per-entry
//!   neighbor links)
//! - the dirty set: ids whose entries have unflushed changes
//!
//! Promotion and insertion are O(1). The registry never evicts on its own;
//! the flush sweep calls [`evict_oldest`](LruRegistry::evict_oldest) after
//! persisting dirty entries, so an entry's changes are on disk before the
//! entry can leave memory.

use crate::entry::CacheEntry;
use rustc_hash::{FxHashMap, FxHashSet};

/// Default number of collections held resident before the sweep trims.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Recency-ordered registry of resident collections.
#[derive(Debug)]
pub struct LruRegistry {
    entries: FxHashMap<String, CacheEntry>,
    newest: Option<String>,
    oldest: Option<String>,
    capacity: usize,
    clock: u64,
    dirty: FxHashSet<String>,
}

impl LruRegistry {
    /// Create an empty registry with the given capacity.
    ///
    /// Capacity is advisory: inserts always succeed, and the flush sweep
    /// brings the registry back under capacity afterwards.
    pub fn new(capacity: usize) -> Self {
        LruRegistry {
            entries: FxHashMap::default(),
            newest: None,
            oldest: None,
            capacity,
            clock: 0,
            dirty: FxHashSet::default(),
        }
    }

    /// Number of resident collections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no collections are resident.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a collection is resident.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up a resident entry.
    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Look up a resident entry mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(id)
    }

    /// Id of the most recently used entry.
    pub fn newest_id(&self) -> Option<&str> {
        self.newest.as_deref()
    }

    /// Id of the least recently used entry.
    pub fn oldest_id(&self) -> Option<&str> {
        self.oldest.as_deref()
    }

    /// Insert an entry as the most recently used.
    ///
    /// Never evicts. An entry already registered under the same id is
    /// replaced, dropping its state.
    pub fn insert(&mut self, entry: CacheEntry) {
        let id = entry.id.clone();
        if self.entries.contains_key(&id) {
            self.detach(&id);
            self.entries.remove(&id);
            self.dirty.remove(&id);
        }
        self.clock += 1;
        let clock = self.clock;
        if entry.dirty {
            self.dirty.insert(id.clone());
        }
        self.entries.insert(id.clone(), entry);
        self.attach_newest(&id, clock);
    }

    /// Move an entry to the most-recently-used position.
    ///
    /// Returns false when the id is not resident. When the entry is
    /// already newest only its access token is refreshed.
    pub fn promote(&mut self, id: &str) -> bool {
        if !self.entries.contains_key(id) {
            return false;
        }
        self.clock += 1;
        let clock = self.clock;
        if self.newest.as_deref() == Some(id) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.last_access = clock;
            }
            return true;
        }
        self.detach(id);
        self.attach_newest(id, clock);
        true
    }

    /// Remove and return the least recently used clean entry.
    ///
    /// Dirty entries are passed over; they become evictable once a sweep
    /// has flushed them. Returns `None` when every resident entry is dirty,
    /// the registry is empty, or the recency links no longer reach a
    /// removable entry (the caller reports that last case as an invariant
    /// violation).
    pub fn evict_oldest(&mut self) -> Option<CacheEntry> {
        let mut cursor = self.oldest.clone();
        while let Some(id) = cursor {
            match self.entries.get(&id) {
                Some(entry) if entry.dirty => cursor = entry.newer.clone(),
                Some(_) => {
                    self.detach(&id);
                    return self.entries.remove(&id);
                }
                None => return None,
            }
        }
        None
    }

    /// Set or clear an entry's dirty flag, keeping the dirty set in sync.
    ///
    /// Returns false when the id is not resident.
    pub fn mark_dirty(&mut self, id: &str, dirty: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.dirty = dirty;
                if dirty {
                    self.dirty.insert(id.to_string());
                } else {
                    self.dirty.remove(id);
                }
                true
            }
            None => false,
        }
    }

    /// Re-derive an id's dirty-set membership from its entry flag.
    ///
    /// The cache layer calls this after running caller operations that may
    /// have set the flag directly on the entry.
    pub fn sync_dirty(&mut self, id: &str) {
        let flagged = self.entries.get(id).map(|e| e.dirty).unwrap_or(false);
        if flagged {
            self.dirty.insert(id.to_string());
        } else {
            self.dirty.remove(id);
        }
    }

    /// Whether an id is in the dirty set.
    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    /// Sorted snapshot of the dirty set.
    pub fn dirty_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.dirty.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of dirty collections.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Resident ids from most to least recently used.
    ///
    /// The walk is capped at `len()` steps so a broken link chain cannot
    /// loop.
    pub fn ids_by_recency(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut cursor = self.newest.clone();
        while let Some(id) = cursor {
            if out.len() == self.entries.len() {
                break;
            }
            cursor = self.entries.get(&id).and_then(|e| e.older.clone());
            out.push(id);
        }
        out
    }

    /// Unlink an entry from the recency list, leaving it in the map.
    fn detach(&mut self, id: &str) {
        let (newer, older) = match self.entries.get_mut(id) {
            Some(entry) => (entry.newer.take(), entry.older.take()),
            None => return,
        };
        match newer.as_deref() {
            Some(n) => {
                if let Some(entry) = self.entries.get_mut(n) {
                    entry.older = older.clone();
                }
            }
            None => self.newest = older.clone(),
        }
        match older.as_deref() {
            Some(o) => {
                if let Some(entry) = self.entries.get_mut(o) {
                    entry.newer = newer.clone();
                }
            }
            None => self.oldest = newer.clone(),
        }
    }

    /// Link an unlinked entry in at the most-recently-used position.
    fn attach_newest(&mut self, id: &str, clock: u64) {
        let previous = self.newest.replace(id.to_string());
        if let Some(entry) = self.entries.get_mut(id) {
            entry.newer = None;
            entry.older = previous.clone();
            entry.last_access = clock;
        }
        match previous {
            Some(prev) => {
                if let Some(entry) = self.entries.get_mut(&prev) {
                    entry.newer = Some(id.to_string());
                }
            }
            None => self.oldest = Some(id.to_string()),
        }
    }
}

impl Default for LruRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
