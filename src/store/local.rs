// src/store/local.rs
//! Single-document store: the whole warehouse tree serialized under one key
//! of a [`KeyValueStore`], rewritten on every mutation.

use std::sync::Mutex;

use async_trait::async_trait;
use log::{info, warn};

use super::document::{self, StoredState};
use super::kv::KeyValueStore;
use super::{SnapshotHub, StoreError, StoreResult, WarehouseStore, WarehouseSubscription};
use crate::models::{Rack, RackPatch, Warehouse};

pub struct LocalWarehouseStore<K: KeyValueStore> {
    kv: K,
    key: String,
    write_lock: Mutex<()>,
    hub: SnapshotHub,
}

impl<K: KeyValueStore> LocalWarehouseStore<K> {
    /// Open the document at `key` (prefixed by `namespace` when non-empty).
    /// An outdated document is migrated and written back immediately.
    pub fn open(kv: K, key: &str, namespace: &str) -> StoreResult<Self> {
        let key = if namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}-{}", namespace, key)
        };

        let store = Self {
            kv,
            key,
            write_lock: Mutex::new(()),
            hub: SnapshotHub::default(),
        };

        let state = match store.kv.get(&store.key)? {
            None => StoredState::default(),
            Some(bytes) => {
                let decoded = document::decode(&bytes)?;
                if !decoded.report.is_noop() {
                    info!(
                        "Migrated '{}' from v{} to v{} ({})",
                        store.key,
                        decoded.report.original_version,
                        decoded.report.final_version,
                        decoded.report.step_descriptions.join("; ")
                    );
                    store.kv.set(&store.key, &document::encode(&decoded.state)?)?;
                }
                decoded.state
            }
        };
        store.hub.publish(state.warehouses);
        Ok(store)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_state(&self) -> StoreResult<StoredState> {
        match self.kv.get(&self.key)? {
            None => Ok(StoredState::default()),
            Some(bytes) => Ok(document::decode(&bytes)?.state),
        }
    }

    /// Read-modify-write of the whole document. `f` returns whether it
    /// changed anything; untouched documents are not rewritten.
    fn mutate<F>(&self, op: &'static str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoredState) -> bool,
    {
        let _span = tracing::debug_span!("local_store", op, key = %self.key).entered();
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut state = self.read_state()?;
        if !f(&mut state) {
            warn!("{}: no matching record in '{}'", op, self.key);
            return Ok(());
        }
        self.kv.set(&self.key, &document::encode(&state)?)?;
        self.hub.publish(state.warehouses);
        Ok(())
    }

    fn with_warehouse<F>(&self, op: &'static str, warehouse_id: &str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Warehouse) -> bool,
    {
        self.mutate(op, |state| {
            state
                .warehouses
                .iter_mut()
                .find(|w| w.id == warehouse_id)
                .is_some_and(f)
        })
    }
}

#[async_trait]
impl<K: KeyValueStore> WarehouseStore for LocalWarehouseStore<K> {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn load_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        Ok(self.read_state()?.warehouses)
    }

    fn subscribe_warehouses(&self) -> WarehouseSubscription {
        self.hub.subscribe()
    }

    async fn save_warehouse(&self, warehouse: &Warehouse) -> StoreResult<()> {
        self.mutate("save_warehouse", |state| {
            match state.warehouses.iter_mut().find(|w| w.id == warehouse.id) {
                Some(existing) => *existing = warehouse.clone(),
                None => state.warehouses.push(warehouse.clone()),
            }
            true
        })
    }

    async fn delete_warehouse(&self, id: &str) -> StoreResult<()> {
        self.mutate("delete_warehouse", |state| {
            let before = state.warehouses.len();
            state.warehouses.retain(|w| w.id != id);
            state.warehouses.len() != before
        })
    }

    async fn rename_warehouse(&self, id: &str, name: &str) -> StoreResult<()> {
        self.with_warehouse("rename_warehouse", id, |wh| {
            wh.name = name.to_string();
            true
        })
    }

    async fn load_racks(&self, warehouse_id: &str) -> StoreResult<Vec<Rack>> {
        Ok(self
            .read_state()?
            .warehouses
            .into_iter()
            .find(|w| w.id == warehouse_id)
            .map(|w| w.racks)
            .unwrap_or_default())
    }

    async fn add_rack(&self, warehouse_id: &str, rack: &Rack) -> StoreResult<()> {
        self.with_warehouse("add_rack", warehouse_id, |wh| {
            match wh.racks.iter_mut().find(|r| r.id == rack.id) {
                Some(existing) => *existing = rack.clone(),
                None => wh.racks.push(rack.clone()),
            }
            true
        })
    }

    async fn update_rack(&self, warehouse_id: &str, rack_id: &str, patch: &RackPatch) -> StoreResult<()> {
        self.with_warehouse("update_rack", warehouse_id, |wh| {
            match wh.racks.iter_mut().find(|r| r.id == rack_id) {
                Some(rack) => {
                    rack.apply_patch(patch);
                    true
                }
                None => false,
            }
        })
    }

    async fn delete_rack(&self, warehouse_id: &str, rack_id: &str) -> StoreResult<()> {
        self.with_warehouse("delete_rack", warehouse_id, |wh| {
            let before = wh.racks.len();
            wh.racks.retain(|r| r.id != rack_id);
            wh.racks.len() != before
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.kv.get(&self.key).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;
    use crate::store::kv::{FileKeyValueStore, MemoryKeyValueStore};
    use crate::store::DEFAULT_STORAGE_KEY;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn rack(id: &str, x: f64) -> Rack {
        Rack::new(
            id.to_string(),
            format!("Rack {}", id),
            Position::on_floor(x, 0.0),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    fn memory_store() -> LocalWarehouseStore<MemoryKeyValueStore> {
        LocalWarehouseStore::open(MemoryKeyValueStore::new(), DEFAULT_STORAGE_KEY, "").unwrap()
    }

    #[actix_rt::test]
    async fn test_warehouse_and_rack_lifecycle() {
        let store = memory_store();
        store.save_warehouse(&Warehouse::new("W-1".into(), "Main".into())).await.unwrap();
        store.add_rack("W-1", &rack("R-1", 0.0)).await.unwrap();
        store.add_rack("W-1", &rack("R-2", 6.0)).await.unwrap();

        store.update_rack("W-1", "R-1", &RackPatch::stock(40)).await.unwrap();
        store.rename_warehouse("W-1", "Central").await.unwrap();
        store.delete_rack("W-1", "R-2").await.unwrap();

        let warehouses = store.load_warehouses().await.unwrap();
        assert_eq!(warehouses.len(), 1);
        assert_eq!(warehouses[0].name, "Central");
        let racks = store.load_racks("W-1").await.unwrap();
        assert_eq!(racks.len(), 1);
        assert_eq!(racks[0].stock, 40);

        store.delete_warehouse("W-1").await.unwrap();
        assert!(store.load_warehouses().await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_missing_ids_are_noops() {
        let store = memory_store();
        store.add_rack("nope", &rack("R-1", 0.0)).await.unwrap();
        store.update_rack("nope", "R-1", &RackPatch::stock(1)).await.unwrap();
        store.delete_warehouse("nope").await.unwrap();
        assert!(store.load_warehouses().await.unwrap().is_empty());
        assert!(store.load_racks("nope").await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_subscribers_see_each_write() {
        let store = memory_store();
        let mut sub = store.subscribe_warehouses();
        let mut racks = store.subscribe_racks("W-1");

        store.save_warehouse(&Warehouse::new("W-1".into(), "Main".into())).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        store.add_rack("W-1", &rack("R-1", 0.0)).await.unwrap();
        let update = racks.next().await.unwrap();
        assert_eq!(update[0].id, "R-1");
    }

    #[actix_rt::test]
    async fn test_file_backend_persists_and_migrates_legacy_blob() {
        let dir = TempDir::new().unwrap();
        let legacy = r#"{"state":{"warehouses":[{"id":"W-1","name":"Main Warehouse","racks":[]}],
            "selectedWarehouseId":"W-1","selectedRack":null,"editMode":false},"version":0}"#;
        std::fs::write(dir.path().join("warehouse-storage.json"), legacy).unwrap();

        {
            let store =
                LocalWarehouseStore::open(FileKeyValueStore::new(dir.path()), DEFAULT_STORAGE_KEY, "").unwrap();
            assert_eq!(store.subscribe_warehouses().current().len(), 1);
            store.add_rack("W-1", &rack("R-1", 4.0)).await.unwrap();
        }

        let raw = std::fs::read_to_string(dir.path().join("warehouse-storage.json")).unwrap();
        assert!(raw.contains("\"version\":2"));
        assert!(!raw.contains("selectedWarehouseId"));

        let reopened =
            LocalWarehouseStore::open(FileKeyValueStore::new(dir.path()), DEFAULT_STORAGE_KEY, "").unwrap();
        assert_eq!(reopened.load_racks("W-1").await.unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_namespaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let alice = LocalWarehouseStore::open(FileKeyValueStore::new(dir.path()), DEFAULT_STORAGE_KEY, "alice").unwrap();
        let bob = LocalWarehouseStore::open(FileKeyValueStore::new(dir.path()), DEFAULT_STORAGE_KEY, "bob").unwrap();

        alice.save_warehouse(&Warehouse::new("W-1".into(), "Alice".into())).await.unwrap();
        assert!(bob.load_warehouses().await.unwrap().is_empty());
        assert_eq!(alice.key(), "alice-warehouse-storage");
    }
}
