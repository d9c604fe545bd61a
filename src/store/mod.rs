// src/store/mod.rs
//! Durable storage contract for warehouses and racks, plus its adapters.
//!
//! Writes are issued after the in-memory engine has already committed the
//! change. A failed write is reported to the caller and never retried here.

use async_trait::async_trait;
use futures::stream::{self, Stream};
use thiserror::Error;
use tokio::sync::watch;

use crate::models::{Rack, RackPatch, Warehouse};

pub mod document;
pub mod kv;
pub mod local;
pub mod migrate;
pub mod sqlite;

pub use document::{StoredState, CURRENT_DOCUMENT_VERSION, DEFAULT_STORAGE_KEY};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use local::LocalWarehouseStore;
pub use sqlite::SqliteWarehouseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is v{found}, newest supported is v{supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence adapter. Referential misses (unknown warehouse or rack ids)
/// are silent no-ops, matching the repositories.
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// All warehouses of the namespace, in creation order, with their racks.
    async fn load_warehouses(&self) -> StoreResult<Vec<Warehouse>>;

    fn subscribe_warehouses(&self) -> WarehouseSubscription;

    /// Upsert a warehouse and replace its racks with `warehouse.racks`.
    async fn save_warehouse(&self, warehouse: &Warehouse) -> StoreResult<()>;

    async fn delete_warehouse(&self, id: &str) -> StoreResult<()>;

    async fn rename_warehouse(&self, id: &str, name: &str) -> StoreResult<()>;

    async fn load_racks(&self, warehouse_id: &str) -> StoreResult<Vec<Rack>>;

    fn subscribe_racks(&self, warehouse_id: &str) -> RackSubscription {
        RackSubscription::new(self.subscribe_warehouses(), warehouse_id)
    }

    async fn add_rack(&self, warehouse_id: &str, rack: &Rack) -> StoreResult<()>;

    async fn update_rack(&self, warehouse_id: &str, rack_id: &str, patch: &RackPatch) -> StoreResult<()>;

    async fn delete_rack(&self, warehouse_id: &str, rack_id: &str) -> StoreResult<()>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ==================== SUBSCRIPTIONS ====================

/// Broadcasts full snapshots to subscribers. Each publish replaces the
/// previous snapshot as a whole.
#[derive(Debug)]
pub struct SnapshotHub {
    tx: watch::Sender<Vec<Warehouse>>,
}

impl SnapshotHub {
    pub fn new(initial: Vec<Warehouse>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn publish(&self, snapshot: Vec<Warehouse>) {
        self.tx.send_replace(snapshot);
    }

    pub fn subscribe(&self) -> WarehouseSubscription {
        WarehouseSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Handle over the warehouse snapshot stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct WarehouseSubscription {
    rx: watch::Receiver<Vec<Warehouse>>,
}

impl WarehouseSubscription {
    pub fn current(&self) -> Vec<Warehouse> {
        self.rx.borrow().clone()
    }

    /// Waits for the next published snapshot; `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<Warehouse>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn into_stream(self) -> impl Stream<Item = Vec<Warehouse>> {
        stream::unfold(self, |mut sub| async move {
            let snapshot = sub.next().await?;
            Some((snapshot, sub))
        })
    }
}

/// Rack snapshots of one warehouse. Only yields when that warehouse's racks
/// actually changed.
#[derive(Debug)]
pub struct RackSubscription {
    inner: WarehouseSubscription,
    warehouse_id: String,
    last: Option<Vec<Rack>>,
}

impl RackSubscription {
    pub fn new(inner: WarehouseSubscription, warehouse_id: &str) -> Self {
        let last = Some(racks_of(&inner.current(), warehouse_id));
        Self {
            inner,
            warehouse_id: warehouse_id.to_string(),
            last,
        }
    }

    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }

    pub async fn next(&mut self) -> Option<Vec<Rack>> {
        loop {
            let snapshot = self.inner.next().await?;
            let racks = racks_of(&snapshot, &self.warehouse_id);
            if self.last.as_ref() != Some(&racks) {
                self.last = Some(racks.clone());
                return Some(racks);
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Vec<Rack>> {
        stream::unfold(self, |mut sub| async move {
            let racks = sub.next().await?;
            Some((racks, sub))
        })
    }
}

fn racks_of(snapshot: &[Warehouse], warehouse_id: &str) -> Vec<Rack> {
    snapshot
        .iter()
        .find(|w| w.id == warehouse_id)
        .map(|w| w.racks.clone())
        .unwrap_or_default()
}
