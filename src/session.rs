// src/session.rs
//! Transient layout-editing state: which warehouse and rack are selected,
//! whether edit mode is on, and the preview of an in-progress drag.
//!
//! ```text
//!  Idle --pick rack--> RackSelected --pointer down on floor (edit mode)--> Dragging
//!   ^                       ^                                                 |
//!   |                       +------------- pointer up / edit mode off --------+
//!   +-- rack deleted, warehouse switched, selection cleared (from any state)
//! ```

use serde::Serialize;

use crate::collision::CollisionDetector;
use crate::geometry::{place_on_floor, FloorPoint, HalfSize, DEFAULT_GRID_STEP, WALL_LIMIT};
use crate::models::{Position, Rack};
use crate::repositories::WarehouseRepository;

// ==================== PLACEMENT RULES ====================

/// Snap, clamp and collision settings shared by drags and direct moves.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRules {
    pub grid_step: f64,
    pub wall_limit: f64,
    pub detector: CollisionDetector,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            grid_step: DEFAULT_GRID_STEP,
            wall_limit: WALL_LIMIT,
            detector: CollisionDetector::default(),
        }
    }
}

impl PlacementRules {
    /// Snapped, wall-clamped floor position for `rack` under the pointer.
    pub fn candidate(&self, raw: FloorPoint, rack: &Rack) -> Position {
        let p = place_on_floor(
            raw,
            self.grid_step,
            self.wall_limit,
            HalfSize::of(rack.width, rack.depth),
        );
        Position::on_floor(p.x, p.z)
    }

    pub fn is_free(&self, position: Position, rack: &Rack, racks: &[Rack]) -> bool {
        !self
            .detector
            .is_colliding(FloorPoint::new(position.x, position.z), rack, racks)
    }
}

// ==================== SESSION ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    RackSelected,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", content = "position", rename_all = "snake_case")]
pub enum DragUpdate {
    /// Preview moved to this position.
    Accepted(Position),
    /// Candidate overlaps another rack; the previous preview stands.
    Blocked,
    /// Not dragging, or the dragged rack is gone.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DropOutcome {
    Committed { rack_id: String, position: Position },
    /// No valid preview, or it collided at drop time.
    Discarded,
    NotDragging,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSession {
    selected_warehouse_id: Option<String>,
    selected_rack_id: Option<String>,
    edit_mode: bool,
    dragging: bool,
    drag_preview: Option<Position>,
}

impl LayoutSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.dragging {
            SessionState::Dragging
        } else if self.selected_rack_id.is_some() {
            SessionState::RackSelected
        } else {
            SessionState::Idle
        }
    }

    pub fn selected_warehouse_id(&self) -> Option<&str> {
        self.selected_warehouse_id.as_deref()
    }

    pub fn selected_rack_id(&self) -> Option<&str> {
        self.selected_rack_id.as_deref()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn drag_preview(&self) -> Option<Position> {
        self.drag_preview
    }

    /// Switching warehouses always deselects the rack.
    pub fn select_warehouse(&mut self, id: Option<String>) {
        self.selected_warehouse_id = id;
        self.clear_selection();
    }

    /// Works regardless of edit mode.
    pub fn pick_rack(&mut self, rack_id: &str) {
        self.cancel_drag();
        self.selected_rack_id = Some(rack_id.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.cancel_drag();
        self.selected_rack_id = None;
    }

    pub fn on_rack_deleted(&mut self, rack_id: &str) {
        if self.selected_rack_id.as_deref() == Some(rack_id) {
            self.clear_selection();
        }
    }

    pub fn toggle_edit_mode(&mut self) -> bool {
        let enabled = !self.edit_mode;
        self.set_edit_mode(enabled);
        enabled
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
        if !enabled {
            self.cancel_drag();
        }
    }

    fn cancel_drag(&mut self) {
        self.dragging = false;
        self.drag_preview = None;
    }

    /// Pointer-down on the floor. Starts a drag only in edit mode with a rack selected.
    pub fn pointer_down(&mut self) -> bool {
        if !self.edit_mode || self.selected_rack_id.is_none() {
            return false;
        }
        self.dragging = true;
        self.drag_preview = None;
        true
    }

    fn dragged_rack<'a>(&self, warehouses: &'a WarehouseRepository) -> Option<(&'a Rack, &'a [Rack])> {
        let racks = warehouses.racks(self.selected_warehouse_id.as_deref()?)?;
        let rack_id = self.selected_rack_id.as_deref()?;
        let rack = racks.iter().find(|r| r.id == rack_id)?;
        Some((rack, racks))
    }

    pub fn pointer_move(
        &mut self,
        warehouses: &WarehouseRepository,
        raw: FloorPoint,
        rules: &PlacementRules,
    ) -> DragUpdate {
        if !self.dragging {
            return DragUpdate::Ignored;
        }
        let Some((rack, racks)) = self.dragged_rack(warehouses) else {
            self.cancel_drag();
            return DragUpdate::Ignored;
        };

        let candidate = rules.candidate(raw, rack);
        if rules.is_free(candidate, rack, racks) {
            self.drag_preview = Some(candidate);
            DragUpdate::Accepted(candidate)
        } else {
            DragUpdate::Blocked
        }
    }

    /// Pointer-up: commit the last valid preview, then return to `RackSelected`.
    pub fn pointer_up(&mut self, warehouses: &mut WarehouseRepository, rules: &PlacementRules) -> DropOutcome {
        if !self.dragging {
            return DropOutcome::NotDragging;
        }
        let preview = self.drag_preview.take();
        self.dragging = false;

        let Some(position) = preview else {
            return DropOutcome::Discarded;
        };
        let Some((rack, racks)) = self.dragged_rack(warehouses) else {
            return DropOutcome::Discarded;
        };
        // racks may have changed since the preview was taken
        if !rules.is_free(position, rack, racks) {
            return DropOutcome::Discarded;
        }

        let rack_id = rack.id.clone();
        let committed = self
            .selected_warehouse_id
            .as_deref()
            .and_then(|wid| warehouses.racks_mut(wid))
            .and_then(|mut repo| repo.move_rack(&rack_id, position).map(|_| ()));
        match committed {
            Some(()) => DropOutcome::Committed { rack_id, position },
            None => DropOutcome::Discarded,
        }
    }

    /// Drop references that a replaced snapshot no longer contains.
    pub fn reconcile(&mut self, warehouses: &WarehouseRepository) {
        let warehouse_ok = self
            .selected_warehouse_id
            .as_deref()
            .is_some_and(|id| warehouses.contains(id));
        if !warehouse_ok {
            self.select_warehouse(warehouses.first().map(|w| w.id.clone()));
            return;
        }
        if self.selected_rack_id.is_some() && self.dragged_rack(warehouses).is_none() {
            self.clear_selection();
        }
    }
}
