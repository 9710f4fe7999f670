//! Dedup Registry - Bounded Record of Produced Digests
//!
//! Persisted as one JSON document (`{"hashes": [...], "records": [...]}`)
//! under a single key. Persistence is best-effort: an unavailable medium or
//! a corrupt document reads as an empty registry, and failed writes are
//! logged and swallowed.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{RegistryConfig, DEFAULT_REGISTRY_CAPACITY, DEFAULT_STORAGE_KEY};
use crate::hashing::Digest;
use crate::storage::KeyValueStore;

/// Audit record for one produced logo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashRecord {
    pub digest: Digest,
    pub brand_name: String,
    pub algorithm_id: String,
    pub variant_index: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub quality_score: u8,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    hashes: Vec<Digest>,
    records: Vec<HashRecord>,
}

impl RegistryDocument {
    fn is_consistent(&self) -> bool {
        self.hashes.len() == self.records.len()
            && self
                .hashes
                .iter()
                .zip(&self.records)
                .all(|(hash, record)| *hash == record.digest)
    }
}

/// Capacity-bounded, oldest-first-evicting registry over a key-value store.
///
/// Every mutation runs load, modify and save under `write_lock`, so callers
/// sharing one registry across threads never overwrite each other's records.
pub struct DedupRegistry<S> {
    store: S,
    key: String,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> DedupRegistry<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_REGISTRY_CAPACITY)
    }

    /// Capacity is raised to at least 1.
    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            key: DEFAULT_STORAGE_KEY.to_string(),
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(store: S, config: &RegistryConfig) -> Self {
        Self {
            store,
            key: config.storage_key.clone(),
            capacity: config.capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn has(&self, digest: &Digest) -> bool {
        self.load().hashes.contains(digest)
    }

    /// Append a record. No-op when its digest is already present.
    pub fn record(&self, entry: HashRecord) {
        let _guard = self.write_lock.lock();
        let mut doc = self.load();
        if doc.hashes.contains(&entry.digest) {
            debug!(digest = %entry.digest, "digest already recorded");
            return;
        }

        let overflow = (doc.hashes.len() + 1).saturating_sub(self.capacity);
        if overflow > 0 {
            doc.hashes.drain(..overflow);
            doc.records.drain(..overflow);
            debug!(evicted = overflow, "evicted oldest registry entries");
        }

        doc.hashes.push(entry.digest.clone());
        doc.records.push(entry);
        self.save(&doc);
    }

    /// Records whose brand name matches, ignoring case and surrounding space.
    pub fn for_brand(&self, name: &str) -> Vec<HashRecord> {
        let wanted = name.trim().to_lowercase();
        self.load()
            .records
            .into_iter()
            .filter(|r| r.brand_name.trim().to_lowercase() == wanted)
            .collect()
    }

    /// All records, oldest first.
    pub fn entries(&self) -> Vec<HashRecord> {
        self.load().records
    }

    pub fn len(&self) -> usize {
        self.load().hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "failed to clear registry");
        }
    }

    fn load(&self) -> RegistryDocument {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return RegistryDocument::default(),
            Err(e) => {
                debug!(key = %self.key, error = %e, "registry storage unavailable");
                return RegistryDocument::default();
            }
        };

        match serde_json::from_str::<RegistryDocument>(&raw) {
            Ok(doc) if doc.is_consistent() => doc,
            Ok(_) => {
                warn!(key = %self.key, "registry document has mismatched entries, treating as empty");
                RegistryDocument::default()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "corrupt registry document, treating as empty");
                RegistryDocument::default()
            }
        }
    }

    fn save(&self, doc: &RegistryDocument) {
        let json = match serde_json::to_string(doc) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize registry");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &json) {
            warn!(key = %self.key, error = %e, "failed to persist registry");
        }
    }
}
