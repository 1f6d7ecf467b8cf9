//! Embedded document store for item reports.
//!
//! Records are bincode-encoded, optionally zstd-compressed, and kept in a
//! [`StoreBackend`] (in-memory or redb). The store assigns ids and strictly
//! increasing timestamps, answers equality-filter queries, and publishes a
//! revision counter that drives [`FeedSubscription`]s.

pub mod backend;
pub mod feed;
pub mod query;

pub use backend::{BackendConfig, InMemoryBackend, StoreBackend};
#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use feed::FeedSubscription;
pub use query::{ItemQuery, SortOrder};

use std::sync::{Arc, Mutex};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use bincode::serde::{decode_from_slice, encode_to_vec};
use chrono::{DateTime, Duration, Utc};
use items::{ItemDraft, ItemError, ItemRecord, ItemStatus, OwnerRef, Principal, PublicItem};
use thiserror::Error;
use tokio::sync::watch;
use zstd::{decode_all, encode_all};

/// Compression codec for stored records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    None,
    /// Embedded photos dominate record size, so this is the default.
    #[default]
    Zstd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// zstd level, 1-22.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn none() -> Self {
        Self {
            codec: CompressionCodec::None,
            level: 0,
        }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("item {0} not found")]
    NotFound(String),
    #[error("item {0} is already returned")]
    AlreadyReturned(String),
    #[error("item {0} belongs to another account")]
    NotOwner(String),
    #[error(transparent)]
    Invalid(#[from] ItemError),
}

impl From<EncodeError> for StoreError {
    fn from(e: EncodeError) -> Self {
        StoreError::Encode(e.to_string())
    }
}

impl From<DecodeError> for StoreError {
    fn from(e: DecodeError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Compression(e.to_string())
    }
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Infrastructure failures, as opposed to caller mistakes.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Backend(_)
                | StoreError::Encode(_)
                | StoreError::Decode(_)
                | StoreError::Compression(_)
        )
    }
}

/// The item document store.
pub struct ItemStore {
    backend: Box<dyn StoreBackend>,
    cfg: StoreConfig,
    /// Serializes writers and remembers the last issued timestamp.
    write_lock: Mutex<DateTime<Utc>>,
    revisions: watch::Sender<u64>,
}

impl ItemStore {
    pub fn open(cfg: StoreConfig) -> Result<Self, StoreError> {
        let backend = cfg.backend.build()?;
        Self::with_backend(cfg, backend)
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(InMemoryBackend::new()),
            cfg: StoreConfig::default(),
            write_lock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            revisions: watch::Sender::new(0),
        }
    }

    /// Wrap an existing backend. Scans it once so timestamps issued later
    /// sort after everything already stored.
    pub fn with_backend(
        cfg: StoreConfig,
        backend: Box<dyn StoreBackend>,
    ) -> Result<Self, StoreError> {
        let store = Self {
            backend,
            cfg,
            write_lock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            revisions: watch::Sender::new(0),
        };
        let mut latest = DateTime::<Utc>::MIN_UTC;
        let mut count = 0usize;
        store.backend.scan(&mut |bytes| {
            let record = store.decode_record(bytes)?;
            latest = latest.max(record.timestamp);
            count += 1;
            Ok(())
        })?;
        *store.lock_writes()? = latest;
        tracing::info!(target: "lostfound::store", records = count, "item store opened");
        Ok(store)
    }

    /// Validate and persist a new report owned by `principal`.
    pub fn insert(&self, draft: ItemDraft, principal: &Principal) -> Result<ItemRecord, StoreError> {
        draft.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let record = {
            let mut last = self.lock_writes()?;
            let now = Utc::now();
            let timestamp = if now > *last {
                now
            } else {
                *last + Duration::microseconds(1)
            };
            let record = ItemRecord::from_draft(id, draft, OwnerRef::from(principal), timestamp);
            let encoded = self.encode_record(&record)?;
            self.backend.put(&record.id, &encoded)?;
            *last = timestamp;
            record
        };
        self.bump_revision();
        tracing::info!(
            target: "lostfound::store",
            item_id = %record.id,
            item_type = %record.item_type,
            category = %record.category,
            owner_uid = %record.owner.uid,
            "item stored"
        );
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Option<ItemRecord>, StoreError> {
        match self.backend.get(id)? {
            Some(bytes) => Ok(Some(self.decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_public(&self, id: &str) -> Result<Option<PublicItem>, StoreError> {
        Ok(self.get(id)?.as_ref().map(PublicItem::from))
    }

    pub fn query(&self, query: &ItemQuery) -> Result<Vec<ItemRecord>, StoreError> {
        let mut records = Vec::new();
        self.backend.scan(&mut |bytes| {
            let record = self.decode_record(bytes)?;
            if query.matches(&record) {
                records.push(record);
            }
            Ok(())
        })?;
        query.sort(&mut records);
        Ok(records)
    }

    pub fn query_public(&self, query: &ItemQuery) -> Result<Vec<PublicItem>, StoreError> {
        Ok(self.query(query)?.iter().map(PublicItem::from).collect())
    }

    /// `open -> returned`, only by the record's owner. A second call fails
    /// with [`StoreError::AlreadyReturned`].
    pub fn mark_returned(&self, id: &str, principal: &Principal) -> Result<ItemRecord, StoreError> {
        let updated = {
            let _writes = self.lock_writes()?;
            let bytes = self
                .backend
                .get(id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let mut record = self.decode_record(&bytes)?;
            if !record.is_owned_by(principal) {
                return Err(StoreError::NotOwner(id.to_string()));
            }
            if record.status == ItemStatus::Returned {
                return Err(StoreError::AlreadyReturned(id.to_string()));
            }
            record.status = ItemStatus::Returned;
            let encoded = self.encode_record(&record)?;
            if !self.backend.compare_and_put(id, &bytes, &encoded)? {
                return Err(StoreError::AlreadyReturned(id.to_string()));
            }
            record
        };
        self.bump_revision();
        tracing::info!(target: "lostfound::store", item_id = %id, "item marked returned");
        Ok(updated)
    }

    /// Live view over `query`; see [`FeedSubscription`].
    pub fn subscribe(self: &Arc<Self>, query: ItemQuery) -> FeedSubscription {
        FeedSubscription::new(Arc::clone(self), query)
    }

    pub fn subscriber_count(&self) -> usize {
        self.revisions.receiver_count()
    }

    pub fn revision(&self) -> u64 {
        *self.revisions.borrow()
    }

    /// Cheap liveness check of the backend.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.backend.get("__ping__").map(|_| ())
    }

    fn bump_revision(&self) {
        self.revisions.send_modify(|rev| *rev += 1);
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, DateTime<Utc>>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }

    fn decode_record(&self, data: &[u8]) -> Result<ItemRecord, StoreError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let (record, _) = decode_from_slice(&decompressed, standard())?;
        Ok(record)
    }

    fn encode_record(&self, record: &ItemRecord) -> Result<Vec<u8>, StoreError> {
        let encoded = encode_to_vec(record, standard())?;
        self.cfg.compression.compress(&encoded)
    }
}

#[cfg(test)]
mod tests;
