// src/engine.rs
//! Application-root object: owns the warehouse repository and the layout
//! session, and applies the rules that span both (adding a warehouse selects
//! it, deleting a rack drops its selection, snapshots reconcile the session).
//!
//! The engine is synchronous and does no I/O. Callers persist the values it
//! returns through a [`crate::store::WarehouseStore`].

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::collision::CollisionDetector;
use crate::geometry::{FloorPoint, DEFAULT_GRID_STEP, FLOOR_AREA, WALL_LIMIT};
use crate::inventory::{self, RackSummary, WarehouseStats, DEFAULT_NEAR_EXPIRY_DAYS};
use crate::models::{Position, Rack, RackPatch, Warehouse};
use crate::repositories::rack_repository::{DEFAULT_SPAWN_ATTEMPTS, DEFAULT_SPAWN_RANGE};
use crate::repositories::{RackRepository, SpawnSettings, WarehouseRepository};
use crate::session::{DragUpdate, DropOutcome, LayoutSession, PlacementRules};

// ==================== SETTINGS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub grid_step: f64,
    pub wall_limit: f64,
    pub floor_area: f64,
    pub collision_clearance: f64,
    pub spawn_range: f64,
    pub spawn_attempts: u32,
    pub near_expiry_days: i64,
    pub default_warehouse_name: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            grid_step: DEFAULT_GRID_STEP,
            wall_limit: WALL_LIMIT,
            floor_area: FLOOR_AREA,
            collision_clearance: 0.0,
            spawn_range: DEFAULT_SPAWN_RANGE,
            spawn_attempts: DEFAULT_SPAWN_ATTEMPTS,
            near_expiry_days: DEFAULT_NEAR_EXPIRY_DAYS,
            default_warehouse_name: "Main Warehouse".to_string(),
        }
    }
}

impl LayoutSettings {
    pub fn detector(&self) -> CollisionDetector {
        CollisionDetector::new(self.collision_clearance)
    }

    pub fn placement_rules(&self) -> PlacementRules {
        PlacementRules {
            grid_step: self.grid_step,
            wall_limit: self.wall_limit,
            detector: self.detector(),
        }
    }

    pub fn spawn_settings(&self) -> SpawnSettings {
        SpawnSettings {
            range: self.spawn_range,
            attempts: self.spawn_attempts,
            detector: self.detector(),
        }
    }
}

// ==================== OUTCOMES ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub moved: bool,
    /// Snapped and clamped target actually evaluated.
    pub position: Position,
    pub rack: Rack,
    pub colliding_with: Vec<String>,
}

// ==================== ENGINE ====================

pub struct LayoutEngine {
    warehouses: WarehouseRepository,
    session: LayoutSession,
    settings: LayoutSettings,
    rng: StdRng,
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_rng(settings: LayoutSettings, rng: StdRng) -> Self {
        Self {
            warehouses: WarehouseRepository::new(),
            session: LayoutSession::new(),
            settings,
            rng,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn session(&self) -> &LayoutSession {
        &self.session
    }

    pub fn warehouses(&self) -> &[Warehouse] {
        self.warehouses.list()
    }

    pub fn warehouse(&self, id: &str) -> Option<&Warehouse> {
        self.warehouses.get(id)
    }

    pub fn active_warehouse(&self) -> Option<&Warehouse> {
        self.session
            .selected_warehouse_id()
            .and_then(|id| self.warehouses.get(id))
    }

    pub fn rack(&self, warehouse_id: &str, rack_id: &str) -> Option<&Rack> {
        self.warehouses.get(warehouse_id)?.rack(rack_id)
    }

    // ---------- snapshots ----------

    /// Initial load. Seeds the default warehouse when storage is empty and
    /// returns it so the caller can persist it.
    pub fn hydrate(&mut self, snapshot: Vec<Warehouse>) -> Option<Warehouse> {
        self.warehouses.replace_all(snapshot);
        let seeded = if self.warehouses.is_empty() {
            let name = self.settings.default_warehouse_name.clone();
            Some(self.warehouses.add_warehouse(&name).clone())
        } else {
            None
        };
        self.session
            .select_warehouse(self.warehouses.first().map(|w| w.id.clone()));
        seeded
    }

    /// Replace everything with an externally pushed snapshot.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Warehouse>) {
        self.warehouses.replace_all(snapshot);
        self.session.reconcile(&self.warehouses);
    }

    /// Replace one warehouse's racks, keeping the rest of the snapshot.
    pub fn apply_rack_snapshot(&mut self, warehouse_id: &str, racks: Vec<Rack>) {
        let mut snapshot = self.warehouses.list().to_vec();
        if let Some(wh) = snapshot.iter_mut().find(|w| w.id == warehouse_id) {
            wh.racks = racks;
            self.apply_snapshot(snapshot);
        }
    }

    // ---------- warehouses ----------

    /// Create a warehouse and make it active.
    pub fn add_warehouse(&mut self, name: &str) -> Warehouse {
        let created = self.warehouses.add_warehouse(name.trim()).clone();
        self.session.select_warehouse(Some(created.id.clone()));
        created
    }

    pub fn rename_warehouse(&mut self, id: &str, name: &str) -> Option<Warehouse> {
        self.warehouses.rename_warehouse(id, name.trim()).cloned()
    }

    /// Remove a warehouse; the first remaining one becomes active.
    pub fn delete_warehouse(&mut self, id: &str) -> Option<Warehouse> {
        let removed = self.warehouses.delete_warehouse(id)?;
        self.session
            .select_warehouse(self.warehouses.first().map(|w| w.id.clone()));
        Some(removed)
    }

    pub fn select_warehouse(&mut self, id: &str) -> bool {
        if !self.warehouses.contains(id) {
            return false;
        }
        self.session.select_warehouse(Some(id.to_string()));
        true
    }

    pub fn stats(&self, warehouse_id: &str, today: NaiveDate) -> Option<WarehouseStats> {
        let racks = self.warehouses.racks(warehouse_id)?;
        Some(inventory::warehouse_stats_with(
            racks,
            today,
            self.settings.floor_area,
            self.settings.near_expiry_days,
        ))
    }

    // ---------- racks ----------

    fn racks_mut(&mut self, warehouse_id: &str) -> Option<RackRepository<'_>> {
        self.warehouses.racks_mut(warehouse_id)
    }

    pub fn rack_summaries(&self, warehouse_id: &str, today: NaiveDate) -> Option<Vec<RackSummary>> {
        let racks = self.warehouses.racks(warehouse_id)?;
        Some(
            racks
                .iter()
                .map(|r| inventory::rack_summary(r, today, self.settings.near_expiry_days))
                .collect(),
        )
    }

    pub fn rack_summary(&self, warehouse_id: &str, rack_id: &str, today: NaiveDate) -> Option<RackSummary> {
        let rack = self.rack(warehouse_id, rack_id)?;
        Some(inventory::rack_summary(rack, today, self.settings.near_expiry_days))
    }

    pub fn add_rack(&mut self, warehouse_id: &str, today: NaiveDate) -> Option<Rack> {
        let spawn = self.settings.spawn_settings();
        let mut repo = self.warehouses.racks_mut(warehouse_id)?;
        Some(repo.add_rack(&mut self.rng, today, &spawn).clone())
    }

    pub fn delete_rack(&mut self, warehouse_id: &str, rack_id: &str) -> Option<Rack> {
        let removed = self.racks_mut(warehouse_id)?.delete_rack(rack_id)?;
        self.session.on_rack_deleted(rack_id);
        Some(removed)
    }

    pub fn update_rack(&mut self, warehouse_id: &str, rack_id: &str, patch: &RackPatch) -> Option<Rack> {
        self.racks_mut(warehouse_id)?
            .update_rack(rack_id, patch)
            .cloned()
    }

    pub fn resize_rack(&mut self, warehouse_id: &str, rack_id: &str, width: f64, depth: f64) -> Option<Rack> {
        self.racks_mut(warehouse_id)?
            .resize_rack(rack_id, width, depth)
            .cloned()
    }

    pub fn set_stock(&mut self, warehouse_id: &str, rack_id: &str, stock: u32) -> Option<Rack> {
        self.racks_mut(warehouse_id)?.set_stock(rack_id, stock).cloned()
    }

    pub fn increment_stock(&mut self, warehouse_id: &str, rack_id: &str) -> Option<Rack> {
        self.racks_mut(warehouse_id)?.increment_stock(rack_id).cloned()
    }

    pub fn decrement_stock(&mut self, warehouse_id: &str, rack_id: &str) -> Option<Rack> {
        self.racks_mut(warehouse_id)?.decrement_stock(rack_id).cloned()
    }

    /// Move a rack towards a raw floor point: snap, clamp, then commit only
    /// when the target is free. A blocked move leaves the rack where it was.
    pub fn move_rack_to(&mut self, warehouse_id: &str, rack_id: &str, raw: FloorPoint) -> Option<MoveOutcome> {
        let rules = self.settings.placement_rules();
        let racks = self.warehouses.racks(warehouse_id)?;
        let rack = racks.iter().find(|r| r.id == rack_id)?;

        let position = rules.candidate(raw, rack);
        let colliding_with =
            rules
                .detector
                .colliding_ids(FloorPoint::new(position.x, position.z), rack, racks);
        if !colliding_with.is_empty() {
            return Some(MoveOutcome {
                moved: false,
                position,
                rack: rack.clone(),
                colliding_with,
            });
        }

        let rack = self.racks_mut(warehouse_id)?.move_rack(rack_id, position)?.clone();
        Some(MoveOutcome {
            moved: true,
            position,
            rack,
            colliding_with,
        })
    }

    // ---------- session ----------

    /// Select a rack of the active warehouse.
    pub fn pick_rack(&mut self, rack_id: &str) -> bool {
        let exists = self
            .active_warehouse()
            .is_some_and(|w| w.rack(rack_id).is_some());
        if exists {
            self.session.pick_rack(rack_id);
        }
        exists
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        self.session.toggle_edit_mode()
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.session.set_edit_mode(enabled);
    }

    pub fn pointer_down(&mut self) -> bool {
        self.session.pointer_down()
    }

    pub fn pointer_move(&mut self, raw: FloorPoint) -> DragUpdate {
        let rules = self.settings.placement_rules();
        self.session.pointer_move(&self.warehouses, raw, &rules)
    }

    /// Ends the drag. A committed drop returns the moved rack for persistence.
    pub fn pointer_up(&mut self) -> (DropOutcome, Option<Rack>) {
        let rules = self.settings.placement_rules();
        let outcome = self.session.pointer_up(&mut self.warehouses, &rules);
        let moved = match &outcome {
            DropOutcome::Committed { rack_id, .. } => self
                .session
                .selected_warehouse_id()
                .and_then(|wid| self.rack(wid, rack_id))
                .cloned(),
            _ => None,
        };
        (outcome, moved)
    }
}
