//! # Node store
//!
//! Content-addressed storage for encoded trie nodes, keyed by their keccak256 digest.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use alloy_primitives::{keccak256, B256};
use tracing::trace;

use crate::error::{Result, TrieError};

/// Database interface for storing encoded nodes.
///
/// `put` must be idempotent: storing the same bytes twice yields the same digest
/// and leaves the store unchanged, whatever the interleaving of writers.
pub trait TrieDB: Send + Sync {
    /// Get encoded node by digest
    fn get(&self, hash: &B256) -> Result<Option<Vec<u8>>>;

    /// Store encoded node, returns its digest
    fn put(&self, data: Vec<u8>) -> Result<B256>;

    fn contains(&self, hash: &B256) -> Result<bool> {
        Ok(self.get(hash)?.is_some())
    }
}

/// In-memory node store
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrieDB {
    inner: Arc<RwLock<HashMap<B256, Vec<u8>>>>,
}

impl InMemoryTrieDB {
    /// Store backed by an existing, possibly shared, map
    pub const fn new(map: Arc<RwLock<HashMap<B256, Vec<u8>>>>) -> Self {
        Self { inner: map }
    }

    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(|_| TrieError::LockError)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl TrieDB for InMemoryTrieDB {
    fn get(&self, hash: &B256) -> Result<Option<Vec<u8>>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| TrieError::LockError)?
            .get(hash)
            .cloned())
    }

    fn put(&self, data: Vec<u8>) -> Result<B256> {
        let hash = keccak256(&data);
        let mut nodes = self.inner.write().map_err(|_| TrieError::LockError)?;
        nodes.entry(hash).or_insert_with(|| {
            trace!(%hash, len = data.len(), "storing node");
            data
        });
        Ok(hash)
    }

    fn contains(&self, hash: &B256) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .map_err(|_| TrieError::LockError)?
            .contains_key(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let db = InMemoryTrieDB::new_empty();
        let hash = db.put(b"node".to_vec()).unwrap();

        assert_eq!(hash, keccak256(b"node"));
        assert_eq!(db.get(&hash).unwrap(), Some(b"node".to_vec()));
        assert!(db.contains(&hash).unwrap());
        assert_eq!(db.get(&keccak256(b"other")).unwrap(), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let db = InMemoryTrieDB::new_empty();
        let first = db.put(vec![1, 2, 3]).unwrap();
        let second = db.put(vec![1, 2, 3]).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.len().unwrap(), 1);
    }

    #[test]
    fn test_shared_map() {
        let map: Arc<RwLock<HashMap<B256, Vec<u8>>>> = Default::default();
        let db = InMemoryTrieDB::new(map.clone());
        let hash = db.put(vec![0xc0]).unwrap();

        assert!(map.read().unwrap().contains_key(&hash));
        map.write().unwrap().remove(&hash);
        assert!(db.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_puts() {
        let db = InMemoryTrieDB::new_empty();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for i in 0u8..32 {
                        db.put(vec![i; 40]).unwrap();
                    }
                });
            }
        });
        assert_eq!(db.len().unwrap(), 32);
    }
}
