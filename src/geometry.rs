// src/geometry.rs
//! Floor-plane helpers: grid snapping and wall clamping.
//!
//! The floor is a 60×60 square centred on the origin with walls at ±25.
//! Racks are kept inside `±WALL_LIMIT`, shrunk by their own half-size.

use serde::{Deserialize, Serialize};

pub const FLOOR_SIZE: f64 = 60.0;
pub const FLOOR_AREA: f64 = FLOOR_SIZE * FLOOR_SIZE;
pub const WALL_LIMIT: f64 = 24.0;
pub const DEFAULT_GRID_STEP: f64 = 2.0;

/// A point on the floor plane. Elevation is not part of the layout math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorPoint {
    pub x: f64,
    pub z: f64,
}

impl FloorPoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// Half of a footprint along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfSize {
    pub x: f64,
    pub z: f64,
}

impl HalfSize {
    pub fn of(width: f64, depth: f64) -> Self {
        Self {
            x: width / 2.0,
            z: depth / 2.0,
        }
    }
}

/// Round each coordinate to the nearest multiple of `grid_step`.
/// Ties round away from zero. A non-positive step leaves the point as is.
pub fn snap_to_grid(raw: FloorPoint, grid_step: f64) -> FloorPoint {
    if !(grid_step > 0.0) {
        return raw;
    }
    FloorPoint {
        x: snap_axis(raw.x, grid_step),
        z: snap_axis(raw.z, grid_step),
    }
}

fn snap_axis(value: f64, step: f64) -> f64 {
    let snapped = (value / step).round() * step;
    // avoid -0.0 leaking into positions
    if snapped == 0.0 {
        0.0
    } else {
        snapped
    }
}

/// Clamp `point` so a footprint of `half` stays within `[-limit, limit]` on both axes.
pub fn clamp_to_bounds(point: FloorPoint, limit: f64, half: HalfSize) -> FloorPoint {
    FloorPoint {
        x: clamp_axis(point.x, limit, half.x),
        z: clamp_axis(point.z, limit, half.z),
    }
}

fn clamp_axis(value: f64, limit: f64, half: f64) -> f64 {
    let lo = -limit + half;
    let hi = limit - half;
    if lo > hi {
        // wider than the floor: centre it
        return 0.0;
    }
    value.clamp(lo, hi)
}

/// Snap then clamp, the full pointer-to-candidate transform.
pub fn place_on_floor(raw: FloorPoint, grid_step: f64, limit: f64, half: HalfSize) -> FloorPoint {
    clamp_to_bounds(snap_to_grid(raw, grid_step), limit, half)
}
