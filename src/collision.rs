// src/collision.rs
//! Axis-aligned footprint overlap between racks on the floor plane.

use crate::geometry::FloorPoint;
use crate::models::Rack;

/// Horizontal footprint of a rack, centred at `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub center: FloorPoint,
    pub width: f64,
    pub depth: f64,
}

impl Footprint {
    pub fn of(rack: &Rack) -> Self {
        Self {
            center: FloorPoint::new(rack.position.x, rack.position.z),
            width: rack.width,
            depth: rack.depth,
        }
    }

    pub fn at(rack: &Rack, center: FloorPoint) -> Self {
        Self {
            center,
            width: rack.width,
            depth: rack.depth,
        }
    }

    /// Strict overlap: footprints that merely touch do not collide.
    /// `clearance` widens the required gap on both axes.
    pub fn overlaps(&self, other: &Footprint, clearance: f64) -> bool {
        let dx = (self.center.x - other.center.x).abs();
        let dz = (self.center.z - other.center.z).abs();
        dx < self.width / 2.0 + other.width / 2.0 + clearance
            && dz < self.depth / 2.0 + other.depth / 2.0 + clearance
    }
}

/// Collision policy for rack moves. The margin is the sum of both footprints'
/// half-extents plus a fixed clearance, which keeps the check symmetric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionDetector {
    pub clearance: f64,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self { clearance: 0.0 }
    }
}

impl CollisionDetector {
    pub fn new(clearance: f64) -> Self {
        Self {
            clearance: clearance.max(0.0),
        }
    }

    /// Would `candidate` placed at `position` overlap any of `others`?
    /// A rack with the candidate's id is skipped.
    pub fn is_colliding<'a, I>(&self, position: FloorPoint, candidate: &Rack, others: I) -> bool
    where
        I: IntoIterator<Item = &'a Rack>,
    {
        let moving = Footprint::at(candidate, position);
        others
            .into_iter()
            .filter(|other| other.id != candidate.id)
            .any(|other| moving.overlaps(&Footprint::of(other), self.clearance))
    }

    /// Ids of every rack the candidate would overlap at `position`.
    pub fn colliding_ids<'a, I>(&self, position: FloorPoint, candidate: &Rack, others: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Rack>,
    {
        let moving = Footprint::at(candidate, position);
        others
            .into_iter()
            .filter(|other| other.id != candidate.id)
            .filter(|other| moving.overlaps(&Footprint::of(other), self.clearance))
            .map(|other| other.id.clone())
            .collect()
    }
}
