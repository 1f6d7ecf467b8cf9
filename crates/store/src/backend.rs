use std::collections::HashMap;
use std::sync::RwLock;

use crate::StoreError;

/// Key-value storage underneath [`crate::ItemStore`].
///
/// Keys are item ids, values are encoded records. The store serializes all
/// writes, so backends only need to make individual calls atomic.
pub trait StoreBackend: Send + Sync {
    /// Insert or replace a value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Fetch a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Visit every stored value. Order is backend-defined.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Replace `key` only if its current value equals `expected`.
    /// Returns `false` when the value changed underneath the caller.
    fn compare_and_put(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
    ) -> Result<bool, StoreError> {
        match self.get(key)? {
            Some(current) if current == expected => {
                self.put(key, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Selects the backend for a store.
///
/// ```
/// use store::BackendConfig;
///
/// let config = BackendConfig::redb("/var/lib/lostfound/items.redb");
/// assert!(matches!(config, BackendConfig::Redb { .. }));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Volatile map, used by tests and the stub deployment.
    #[default]
    InMemory,
    /// Persistent redb file. Requires the `backend-redb` feature.
    Redb { path: String },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// A `RwLock<HashMap>` backend.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        for value in guard.values() {
            visitor(value)?;
        }
        Ok(())
    }

    fn compare_and_put(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
    ) -> Result<bool, StoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        match guard.get_mut(key) {
            Some(current) if current.as_slice() == expected => {
                *current = value.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
