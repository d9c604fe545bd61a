// src/store/document.rs
//! The persisted warehouse document: `{"version": N, "state": {...}}`.
//!
//! Version history:
//! - v0: state carried UI session fields next to `warehouses`, dates as `""`
//! - v1: session-free, but may still be a single flat `racks` list with `capacity`
//! - v2: `{"warehouses": [...]}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::migrate::{MigrationRegistry, MigrationReport, MigrationStep};
use super::StoreResult;
use crate::models::{Rack, Warehouse};

pub const CURRENT_DOCUMENT_VERSION: u32 = 2;
pub const DEFAULT_STORAGE_KEY: &str = "warehouse-storage";

pub const LEGACY_WAREHOUSE_ID: &str = "W-1";
pub const LEGACY_WAREHOUSE_NAME: &str = "Main Warehouse";

const SESSION_FIELDS: &[&str] = &[
    "selectedWarehouseId",
    "selectedRack",
    "selectedRackId",
    "editMode",
    "dragPreviewPosition",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    state: Value,
}

/// A decoded document and the migrations it went through.
#[derive(Debug)]
pub struct Decoded {
    pub state: StoredState,
    pub report: MigrationReport,
}

pub fn migration_registry() -> MigrationRegistry {
    MigrationRegistry::new(
        vec![
            MigrationStep {
                from_version: 0,
                description: "drop UI session fields and empty date strings",
                migrate_fn: strip_session_fields,
            },
            MigrationStep {
                from_version: 1,
                description: "fold flat rack list into a default warehouse",
                migrate_fn: fold_into_warehouses,
            },
        ],
        CURRENT_DOCUMENT_VERSION,
    )
}

pub fn decode(bytes: &[u8]) -> StoreResult<Decoded> {
    let Envelope { version, mut state } = serde_json::from_slice(bytes)?;
    if state.is_null() {
        state = Value::Object(Map::new());
    }
    let report = migration_registry().migrate(version, &mut state)?;
    let mut state: StoredState = serde_json::from_value(state)?;
    state
        .warehouses
        .iter_mut()
        .flat_map(|w| w.racks.iter_mut())
        .for_each(Rack::normalize);
    Ok(Decoded { state, report })
}

pub fn encode(state: &StoredState) -> StoreResult<Vec<u8>> {
    let envelope = Envelope {
        version: CURRENT_DOCUMENT_VERSION,
        state: serde_json::to_value(state)?,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

// ==================== STEPS ====================

fn state_object(state: &mut Value) -> Result<&mut Map<String, Value>, String> {
    state
        .as_object_mut()
        .ok_or_else(|| "state is not a JSON object".to_string())
}

fn for_each_rack(state: &mut Map<String, Value>, mut f: impl FnMut(&mut Map<String, Value>)) {
    if let Some(Value::Array(racks)) = state.get_mut("racks") {
        racks.iter_mut().filter_map(Value::as_object_mut).for_each(&mut f);
    }
    if let Some(Value::Array(warehouses)) = state.get_mut("warehouses") {
        for wh in warehouses.iter_mut() {
            if let Some(Value::Array(racks)) = wh.get_mut("racks") {
                racks.iter_mut().filter_map(Value::as_object_mut).for_each(&mut f);
            }
        }
    }
}

fn strip_session_fields(state: &mut Value) -> Result<(), String> {
    let obj = state_object(state)?;
    for key in SESSION_FIELDS {
        obj.remove(*key);
    }
    for_each_rack(obj, |rack| {
        for key in ["entryDate", "expiryDate"] {
            if rack.get(key).and_then(Value::as_str).is_some_and(|s| s.trim().is_empty()) {
                rack.insert(key.to_string(), Value::Null);
            }
        }
    });
    Ok(())
}

fn fold_into_warehouses(state: &mut Value) -> Result<(), String> {
    let obj = state_object(state)?;
    let flat = obj.remove("racks");
    if !obj.contains_key("warehouses") {
        let racks = match flat {
            Some(Value::Array(racks)) => racks,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err("legacy `racks` is not a list".to_string()),
        };
        let warehouse = serde_json::json!({
            "id": LEGACY_WAREHOUSE_ID,
            "name": LEGACY_WAREHOUSE_NAME,
            "racks": racks,
        });
        obj.insert("warehouses".to_string(), Value::Array(vec![warehouse]));
    }
    for_each_rack(obj, |rack| {
        rack.remove("capacity");
    });
    Ok(())
}
