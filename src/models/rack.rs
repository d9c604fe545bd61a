// src/models/rack.rs
//! Rack model: a positioned, sized storage unit with inventory and date metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Fixed elevation of every rack. Visual only; never used by collision or capacity.
pub const RACK_ELEVATION: f64 = 1.0;

pub const MIN_RACK_DIMENSION: f64 = 1.0;
pub const MIN_BAGS_PER_LEVEL: u32 = 1;

pub const DEFAULT_BAGS_PER_LEVEL: u32 = 5;
pub const DEFAULT_RACK_WIDTH: f64 = 1.5;
pub const DEFAULT_RACK_DEPTH: f64 = 1.0;

// ==================== POSITION ====================

/// Rack centre in floor-plan units. Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A floor position at the fixed rack elevation.
    pub fn on_floor(x: f64, z: f64) -> Self {
        Self { x, y: RACK_ELEVATION, z }
    }
}

impl From<[f64; 3]> for Position {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Position> for [f64; 3] {
    fn from(p: Position) -> Self {
        [p.x, p.y, p.z]
    }
}

// ==================== RACK ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    pub id: String,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_bags_per_level")]
    pub bags_per_level: u32,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_depth")]
    pub depth: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub entry_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub rate: f64,
}

fn default_bags_per_level() -> u32 {
    DEFAULT_BAGS_PER_LEVEL
}

fn default_width() -> f64 {
    DEFAULT_RACK_WIDTH
}

fn default_depth() -> f64 {
    DEFAULT_RACK_DEPTH
}

/// Persisted documents store a missing date as `""`.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Rack {
    /// A rack with the default inventory settings, placed at `position`.
    pub fn new(id: String, name: String, position: Position, entry_date: NaiveDate) -> Self {
        Self {
            id,
            name,
            position,
            stock: 0,
            bags_per_level: DEFAULT_BAGS_PER_LEVEL,
            width: DEFAULT_RACK_WIDTH,
            depth: DEFAULT_RACK_DEPTH,
            entry_date: Some(entry_date),
            expiry_date: None,
            rate: 0.0,
        }
    }

    /// Restore the dimension and bags-per-level floors on a rack read from storage.
    pub fn normalize(&mut self) {
        self.width = clamp_dimension(self.width);
        self.depth = clamp_dimension(self.depth);
        self.bags_per_level = self.bags_per_level.max(MIN_BAGS_PER_LEVEL);
    }

    pub fn footprint_area(&self) -> f64 {
        self.width * self.depth
    }

    /// Merge a partial update. Dimensions and bags-per-level are clamped when touched.
    pub fn apply_patch(&mut self, patch: &RackPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(bags) = patch.bags_per_level {
            self.bags_per_level = bags.max(MIN_BAGS_PER_LEVEL);
        }
        if let Some(width) = patch.width {
            self.width = clamp_dimension(width);
        }
        if let Some(depth) = patch.depth {
            self.depth = clamp_dimension(depth);
        }
        if let Some(ref entry) = patch.entry_date {
            self.entry_date = *entry;
        }
        if let Some(ref expiry) = patch.expiry_date {
            self.expiry_date = *expiry;
        }
        if let Some(rate) = patch.rate {
            self.rate = rate.max(0.0);
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }
}

pub fn clamp_dimension(value: f64) -> f64 {
    if value.is_nan() {
        MIN_RACK_DIMENSION
    } else {
        value.max(MIN_RACK_DIMENSION)
    }
}

// ==================== PATCH ====================

/// Partial rack update. `None` leaves a field untouched; for the dates,
/// `Some(None)` clears the value. `position` is never read from a request:
/// placement goes through the snapped, clamped and collision-checked move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RackPatch {
    #[validate(length(min = 1, max = 100, message = "Rack name must be between 1 and 100 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bags_per_level: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "patch_date"
    )]
    pub entry_date: Option<Option<NaiveDate>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "patch_date"
    )]
    pub expiry_date: Option<Option<NaiveDate>>,

    #[validate(range(min = 0.0, message = "Rate must be non-negative"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,

    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// A present date key always yields `Some`, so `null` or `""` clears the date.
fn patch_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    empty_string_as_none(deserializer).map(Some)
}

impl RackPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn stock(stock: u32) -> Self {
        Self {
            stock: Some(stock),
            ..Self::default()
        }
    }

    pub fn size(width: f64, depth: f64) -> Self {
        Self {
            width: Some(width),
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate)]
pub struct ResizeRackRequest {
    #[validate(range(min = 0.0, max = 100.0, message = "Width must be between 0 and 100"))]
    pub width: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "Depth must be between 0 and 100"))]
    pub depth: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetStockRequest {
    #[validate(range(min = 0, message = "Stock must be a non-negative integer"))]
    pub stock: i64,
}

/// Raw floor coordinates, already projected onto the floor plane.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FloorPointRequest {
    pub x: f64,
    pub z: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rack() -> Rack {
        Rack::new(
            "r-1".to_string(),
            "Rack-1".to_string(),
            Position::on_floor(0.0, 0.0),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_patch_clamps_touched_fields() {
        let mut rack = sample_rack();
        rack.apply_patch(&RackPatch {
            width: Some(0.2),
            depth: Some(-3.0),
            bags_per_level: Some(0),
            ..RackPatch::default()
        });
        assert_eq!(rack.width, 1.0);
        assert_eq!(rack.depth, 1.0);
        assert_eq!(rack.bags_per_level, 1);
    }

    #[test]
    fn test_patch_leaves_untouched_fields() {
        let mut rack = sample_rack();
        rack.stock = 7;
        rack.apply_patch(&RackPatch {
            name: Some("Cold store".to_string()),
            ..RackPatch::default()
        });
        assert_eq!(rack.name, "Cold store");
        assert_eq!(rack.stock, 7);
        assert_eq!(rack.width, DEFAULT_RACK_WIDTH);
    }

    #[test]
    fn test_legacy_rack_json_with_empty_dates() {
        let json = r#"{
            "id": "R-1700000000000",
            "name": "Rack-1",
            "position": [3.5, 1, -2],
            "stock": 12,
            "bagsPerLevel": 5,
            "width": 1.5,
            "depth": 1,
            "entryDate": "2024-03-01",
            "expiryDate": "",
            "rate": 0
        }"#;
        let rack: Rack = serde_json::from_str(json).unwrap();
        assert_eq!(rack.position, Position::new(3.5, 1.0, -2.0));
        assert_eq!(rack.entry_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(rack.expiry_date, None);
    }

    #[test]
    fn test_patch_date_clear_vs_absent() {
        let clear: RackPatch = serde_json::from_str(r#"{"expiryDate": ""}"#).unwrap();
        assert_eq!(clear.expiry_date, Some(None));

        let absent: RackPatch = serde_json::from_str(r#"{"rate": 2.5}"#).unwrap();
        assert_eq!(absent.expiry_date, None);
        assert_eq!(absent.rate, Some(2.5));
    }

    #[test]
    fn test_patch_ignores_position_from_json() {
        let patch: RackPatch = serde_json::from_str(r#"{"position": [500, 1, -500]}"#).unwrap();
        assert_eq!(patch.position, None);
        assert!(patch.is_empty());
    }

    #[test]
    fn test_normalize_restores_floors() {
        let mut rack = sample_rack();
        rack.width = 0.5;
        rack.depth = f64::NAN;
        rack.bags_per_level = 0;
        rack.normalize();
        assert_eq!(rack.width, 1.0);
        assert_eq!(rack.depth, 1.0);
        assert_eq!(rack.bags_per_level, 1);
    }

    #[test]
    fn test_position_serializes_as_array() {
        let json = serde_json::to_string(&Position::on_floor(2.0, -4.0)).unwrap();
        assert_eq!(json, "[2.0,1.0,-4.0]");
    }
}
