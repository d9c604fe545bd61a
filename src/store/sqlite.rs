// src/store/sqlite.rs
//! SQL-backed store. Every row carries the owner namespace; insertion order
//! (rowid) is the canonical order of warehouses and racks.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::warn;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{SnapshotHub, StoreResult, WarehouseStore, WarehouseSubscription};
use crate::models::{Position, Rack, RackPatch, Warehouse};

#[derive(Debug, sqlx::FromRow)]
struct WarehouseRow {
    id: String,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RackRow {
    id: String,
    warehouse_id: String,
    name: String,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    stock: i64,
    bags_per_level: i64,
    width: f64,
    depth: f64,
    entry_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    rate: f64,
}

impl From<RackRow> for Rack {
    fn from(row: RackRow) -> Self {
        let mut rack = Rack {
            id: row.id,
            name: row.name,
            position: Position::new(row.pos_x, row.pos_y, row.pos_z),
            stock: row.stock.clamp(0, u32::MAX as i64) as u32,
            bags_per_level: row.bags_per_level.clamp(1, u32::MAX as i64) as u32,
            width: row.width,
            depth: row.depth,
            entry_date: row.entry_date,
            expiry_date: row.expiry_date,
            rate: row.rate,
        };
        rack.normalize();
        rack
    }
}

const RACK_COLUMNS: &str = "id, warehouse_id, name, pos_x, pos_y, pos_z, stock, bags_per_level, \
                            width, depth, entry_date, expiry_date, rate";

pub struct SqliteWarehouseStore {
    pool: SqlitePool,
    owner_id: String,
    hub: SnapshotHub,
}

impl SqliteWarehouseStore {
    /// Wrap a migrated pool. The current contents of `owner_id` seed the
    /// subscription hub.
    pub async fn new(pool: SqlitePool, owner_id: &str) -> StoreResult<Self> {
        let store = Self {
            pool,
            owner_id: owner_id.to_string(),
            hub: SnapshotHub::default(),
        };
        let snapshot = store.fetch_all().await?;
        store.hub.publish(snapshot);
        Ok(store)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Warehouse>> {
        let rows: Vec<WarehouseRow> = sqlx::query_as(
            "SELECT id, name FROM warehouses WHERE owner_id = ? ORDER BY rowid ASC",
        )
        .bind(&self.owner_id)
        .fetch_all(&self.pool)
        .await?;

        let racks: Vec<RackRow> = sqlx::query_as(&format!(
            "SELECT {} FROM racks WHERE owner_id = ? ORDER BY rowid ASC",
            RACK_COLUMNS
        ))
        .bind(&self.owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut warehouses: Vec<Warehouse> = rows
            .into_iter()
            .map(|row| Warehouse::new(row.id, row.name))
            .collect();
        for row in racks {
            if let Some(wh) = warehouses.iter_mut().find(|w| w.id == row.warehouse_id) {
                wh.racks.push(row.into());
            }
        }
        Ok(warehouses)
    }

    async fn publish(&self) -> StoreResult<()> {
        let snapshot = self.fetch_all().await?;
        self.hub.publish(snapshot);
        Ok(())
    }

    async fn warehouse_exists(&self, tx: &mut Transaction<'_, Sqlite>, warehouse_id: &str) -> StoreResult<bool> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT id FROM warehouses WHERE owner_id = ? AND id = ?")
                .bind(&self.owner_id)
                .bind(warehouse_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(found.is_some())
    }

    async fn insert_rack(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        warehouse_id: &str,
        rack: &Rack,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO racks (
                id, owner_id, warehouse_id, name, pos_x, pos_y, pos_z, stock,
                bags_per_level, width, depth, entry_date, expiry_date, rate
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id, warehouse_id, id) DO UPDATE SET
                name = excluded.name,
                pos_x = excluded.pos_x,
                pos_y = excluded.pos_y,
                pos_z = excluded.pos_z,
                stock = excluded.stock,
                bags_per_level = excluded.bags_per_level,
                width = excluded.width,
                depth = excluded.depth,
                entry_date = excluded.entry_date,
                expiry_date = excluded.expiry_date,
                rate = excluded.rate
            "#,
        )
        .bind(&rack.id)
        .bind(&self.owner_id)
        .bind(warehouse_id)
        .bind(&rack.name)
        .bind(rack.position.x)
        .bind(rack.position.y)
        .bind(rack.position.z)
        .bind(rack.stock as i64)
        .bind(rack.bags_per_level as i64)
        .bind(rack.width)
        .bind(rack.depth)
        .bind(rack.entry_date)
        .bind(rack.expiry_date)
        .bind(rack.rate)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WarehouseStore for SqliteWarehouseStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn load_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        self.fetch_all().await
    }

    fn subscribe_warehouses(&self) -> WarehouseSubscription {
        self.hub.subscribe()
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %warehouse.id))]
    async fn save_warehouse(&self, warehouse: &Warehouse) -> StoreResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO warehouses (id, owner_id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(owner_id, id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at
            "#,
        )
        .bind(&warehouse.id)
        .bind(&self.owner_id)
        .bind(&warehouse.name)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Racks are replaced wholesale so their rowids follow the given order
        sqlx::query("DELETE FROM racks WHERE owner_id = ? AND warehouse_id = ?")
            .bind(&self.owner_id)
            .bind(&warehouse.id)
            .execute(&mut *tx)
            .await?;
        for rack in &warehouse.racks {
            self.insert_rack(&mut tx, &warehouse.id, rack).await?;
        }

        tx.commit().await?;
        self.publish().await
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %id))]
    async fn delete_warehouse(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM racks WHERE owner_id = ? AND warehouse_id = ?")
            .bind(&self.owner_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM warehouses WHERE owner_id = ? AND id = ?")
            .bind(&self.owner_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            warn!("delete_warehouse: '{}' not found", id);
            return Ok(());
        }
        self.publish().await
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %id))]
    async fn rename_warehouse(&self, id: &str, name: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE warehouses SET name = ?, updated_at = ? WHERE owner_id = ? AND id = ?",
        )
        .bind(name)
        .bind(Utc::now())
        .bind(&self.owner_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("rename_warehouse: '{}' not found", id);
            return Ok(());
        }
        self.publish().await
    }

    async fn load_racks(&self, warehouse_id: &str) -> StoreResult<Vec<Rack>> {
        let rows: Vec<RackRow> = sqlx::query_as(&format!(
            "SELECT {} FROM racks WHERE owner_id = ? AND warehouse_id = ? ORDER BY rowid ASC",
            RACK_COLUMNS
        ))
        .bind(&self.owner_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Rack::from).collect())
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %warehouse_id, rack_id = %rack.id))]
    async fn add_rack(&self, warehouse_id: &str, rack: &Rack) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        if !self.warehouse_exists(&mut tx, warehouse_id).await? {
            warn!("add_rack: warehouse '{}' not found", warehouse_id);
            return Ok(());
        }
        self.insert_rack(&mut tx, warehouse_id, rack).await?;
        tx.commit().await?;
        self.publish().await
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %warehouse_id, rack_id = %rack_id))]
    async fn update_rack(&self, warehouse_id: &str, rack_id: &str, patch: &RackPatch) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let row: Option<RackRow> = sqlx::query_as(&format!(
            "SELECT {} FROM racks WHERE owner_id = ? AND warehouse_id = ? AND id = ?",
            RACK_COLUMNS
        ))
        .bind(&self.owner_id)
        .bind(warehouse_id)
        .bind(rack_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            warn!("update_rack: rack '{}' not found in '{}'", rack_id, warehouse_id);
            return Ok(());
        };

        let mut rack = Rack::from(row);
        rack.apply_patch(patch);
        self.insert_rack(&mut tx, warehouse_id, &rack).await?;
        tx.commit().await?;
        self.publish().await
    }

    #[tracing::instrument(skip_all, fields(warehouse_id = %warehouse_id, rack_id = %rack_id))]
    async fn delete_rack(&self, warehouse_id: &str, rack_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM racks WHERE owner_id = ? AND warehouse_id = ? AND id = ?")
            .bind(&self.owner_id)
            .bind(warehouse_id)
            .bind(rack_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!("delete_rack: rack '{}' not found in '{}'", rack_id, warehouse_id);
            return Ok(());
        }
        self.publish().await
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
