//! # History Store
//!
//! Bounded, most-recent-first record of past scans, persisted under a fixed
//! key after every change.
//!
//! ```text
//! record("X")  →  [X]
//! record("Y")  →  [Y, X]
//! record("X")  →  dedup: [X, Y]      no dedup: [X, Y, X]
//! ```
//!
//! Storage failures never propagate: a failed write is logged and the
//! in-memory list stays authoritative; a failed or corrupt read starts empty.

use log::{debug, warn};

use crate::core::record::ScanRecord;
use crate::core::storage::SharedStore;

pub const DEFAULT_SCAN_CAP: usize = 20;
pub const DEFAULT_LINK_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Maximum number of entries kept; oldest are evicted first.
    pub cap: usize,
    /// Re-recording an existing payload moves it to the front instead of
    /// adding a second copy.
    pub dedup: bool,
}

impl HistoryPolicy {
    pub fn new(cap: usize, dedup: bool) -> Self {
        Self {
            cap: cap.max(1),
            dedup,
        }
    }
}

pub struct HistoryStore {
    key: String,
    policy: HistoryPolicy,
    entries: Vec<ScanRecord>,
    store: SharedStore,
}

impl HistoryStore {
    /// Creates an empty store. Call [`HistoryStore::load`] once at startup.
    pub fn new(store: SharedStore, key: impl Into<String>, policy: HistoryPolicy) -> Self {
        Self {
            key: key.into(),
            policy: HistoryPolicy::new(policy.cap, policy.dedup),
            entries: Vec::new(),
            store,
        }
    }

    /// Replaces the in-memory entries with the persisted ones.
    ///
    /// Missing, unreadable or malformed data yields an empty history.
    pub fn load(&mut self) {
        self.entries = match self.store.get(&self.key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<ScanRecord>>(&bytes) {
                Ok(mut entries) => {
                    entries.truncate(self.policy.cap);
                    entries
                }
                Err(e) => {
                    warn!("Discarding corrupt history under {}: {}", self.key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read history {}: {}", self.key, e);
                Vec::new()
            }
        };
        debug!("Loaded {} entries from {}", self.entries.len(), self.key);
    }

    /// Inserts `entry` at the front, applying dedup and the cap, then persists.
    pub fn record(&mut self, entry: ScanRecord) {
        if self.policy.dedup {
            self.entries.retain(|e| e.payload != entry.payload);
        }
        self.entries.insert(0, entry);
        self.entries.truncate(self.policy.cap);
        self.persist();
    }

    /// Most recent first.
    pub fn list(&self) -> &[ScanRecord] {
        &self.entries
    }

    /// Empties the list and the persisted copy. If the key cannot be
    /// removed, an empty list is written over it so a reload stays empty.
    pub fn clear(&mut self) {
        self.entries.clear();
        let Err(e) = self.store.remove(&self.key) else {
            return;
        };
        warn!("Failed to remove persisted history {}: {}", self.key, e);
        if let Err(e) = self.store.set(&self.key, b"[]") {
            warn!("Failed to overwrite persisted history {}: {}", self.key, e);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.entries) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize history {}: {}", self.key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &bytes) {
            warn!("Failed to persist history {}: {}", self.key, e);
        }
    }
}
