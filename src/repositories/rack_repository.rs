// src/repositories/rack_repository.rs
//! Rack CRUD scoped to a single warehouse.
//!
//! Every mutation preserves `width >= 1`, `depth >= 1`, `bags_per_level >= 1`
//! and `stock >= 0`. Unknown ids are a no-op, never an error.

use chrono::NaiveDate;
use rand::Rng;

use super::new_id;
use crate::collision::CollisionDetector;
use crate::geometry::FloorPoint;
use crate::models::{clamp_dimension, Position, Rack, RackPatch, Warehouse, MIN_BAGS_PER_LEVEL};

pub const DEFAULT_SPAWN_RANGE: f64 = 15.0;
pub const DEFAULT_SPAWN_ATTEMPTS: u32 = 8;

/// Where new racks appear: uniformly in `[-range, range]` on both axes.
#[derive(Debug, Clone, Copy)]
pub struct SpawnSettings {
    pub range: f64,
    pub attempts: u32,
    pub detector: CollisionDetector,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            range: DEFAULT_SPAWN_RANGE,
            attempts: DEFAULT_SPAWN_ATTEMPTS,
            detector: CollisionDetector::default(),
        }
    }
}

pub struct RackRepository<'w> {
    warehouse: &'w mut Warehouse,
}

impl<'w> RackRepository<'w> {
    pub fn new(warehouse: &'w mut Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn list(&self) -> &[Rack] {
        &self.warehouse.racks
    }

    pub fn get(&self, id: &str) -> Option<&Rack> {
        self.warehouse.rack(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Rack> {
        self.warehouse.racks.iter_mut().find(|r| r.id == id)
    }

    /// Append a rack with default inventory settings at a random spot.
    pub fn add_rack<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        today: NaiveDate,
        spawn: &SpawnSettings,
    ) -> &Rack {
        let name = format!("Rack-{}", self.warehouse.racks.len() + 1);
        let mut rack = Rack::new(new_id(), name, Position::on_floor(0.0, 0.0), today);

        let range = spawn.range.abs();
        let attempts = spawn.attempts.max(1);
        for _ in 0..attempts {
            let point = random_point(rng, range);
            rack.position = Position::on_floor(point.x, point.z);
            if !spawn.detector.is_colliding(point, &rack, &self.warehouse.racks) {
                break;
            }
        }

        self.warehouse.racks.push(rack);
        let last = self.warehouse.racks.len() - 1;
        &self.warehouse.racks[last]
    }

    pub fn delete_rack(&mut self, id: &str) -> Option<Rack> {
        let idx = self.warehouse.racks.iter().position(|r| r.id == id)?;
        Some(self.warehouse.racks.remove(idx))
    }

    pub fn update_rack(&mut self, id: &str, patch: &RackPatch) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.apply_patch(patch);
        Some(rack)
    }

    /// Commit a position. Collision checks are the caller's job.
    pub fn move_rack(&mut self, id: &str, position: Position) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.position = position;
        Some(rack)
    }

    pub fn resize_rack(&mut self, id: &str, width: f64, depth: f64) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.width = clamp_dimension(width);
        rack.depth = clamp_dimension(depth);
        Some(rack)
    }

    pub fn rename_rack(&mut self, id: &str, name: &str) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.name = name.to_string();
        Some(rack)
    }

    pub fn set_bags_per_level(&mut self, id: &str, value: u32) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.bags_per_level = value.max(MIN_BAGS_PER_LEVEL);
        Some(rack)
    }

    pub fn set_stock(&mut self, id: &str, value: u32) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.stock = value;
        Some(rack)
    }

    pub fn increment_stock(&mut self, id: &str) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.stock = rack.stock.saturating_add(1);
        Some(rack)
    }

    pub fn decrement_stock(&mut self, id: &str) -> Option<&Rack> {
        let rack = self.get_mut(id)?;
        rack.stock = rack.stock.saturating_sub(1);
        Some(rack)
    }
}

fn random_point<R: Rng + ?Sized>(rng: &mut R, range: f64) -> FloorPoint {
    if range == 0.0 {
        return FloorPoint::new(0.0, 0.0);
    }
    FloorPoint::new(rng.gen_range(-range..range), rng.gen_range(-range..range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn warehouse() -> Warehouse {
        Warehouse::new("w-1".to_string(), "Main Warehouse".to_string())
    }

    #[test]
    fn test_add_rack_defaults() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(7);
        let mut repo = RackRepository::new(&mut wh);

        let rack = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).clone();

        assert_eq!(repo.list().len(), 1);
        assert_eq!(rack.stock, 0);
        assert_eq!(rack.bags_per_level, 5);
        assert_eq!(rack.width, 1.5);
        assert_eq!(rack.depth, 1.0);
        assert_eq!(rack.rate, 0.0);
        assert_eq!(rack.entry_date, Some(today()));
        assert_eq!(rack.expiry_date, None);
        assert_eq!(rack.position.y, 1.0);
        assert!(rack.position.x >= -15.0 && rack.position.x < 15.0);
        assert!(rack.position.z >= -15.0 && rack.position.z < 15.0);
        assert_eq!(rack.name, "Rack-1");
    }

    #[test]
    fn test_add_rack_appends_in_creation_order() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(1);
        let mut repo = RackRepository::new(&mut wh);
        let first = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).id.clone();
        let second = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).id.clone();

        let ids: Vec<_> = repo.list().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(3);
        let mut repo = RackRepository::new(&mut wh);
        let id = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).id.clone();

        for (w, d) in [(0.0, 0.0), (-5.0, 0.5), (3.0, f64::NAN), (2.5, 4.0)] {
            let rack = repo.resize_rack(&id, w, d).unwrap();
            assert!(rack.width >= 1.0 && rack.depth >= 1.0);
        }
        assert_eq!(repo.get(&id).map(|r| (r.width, r.depth)), Some((2.5, 4.0)));
    }

    #[test]
    fn test_stock_never_negative() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(5);
        let mut repo = RackRepository::new(&mut wh);
        let id = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).id.clone();

        assert_eq!(repo.decrement_stock(&id).map(|r| r.stock), Some(0));
        repo.increment_stock(&id);
        repo.increment_stock(&id);
        assert_eq!(repo.decrement_stock(&id).map(|r| r.stock), Some(1));
        assert_eq!(repo.set_stock(&id, 40).map(|r| r.stock), Some(40));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut wh = warehouse();
        let mut repo = RackRepository::new(&mut wh);
        assert!(repo.delete_rack("missing").is_none());
        assert!(repo.update_rack("missing", &RackPatch::stock(3)).is_none());
        assert!(repo.move_rack("missing", Position::on_floor(1.0, 1.0)).is_none());
        assert!(repo.increment_stock("missing").is_none());
        assert!(repo.list().is_empty());
    }

    #[test]
    fn test_spawn_avoids_occupied_floor_when_possible() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(11);
        let spawn = SpawnSettings {
            range: 15.0,
            attempts: 64,
            detector: CollisionDetector::default(),
        };
        let mut repo = RackRepository::new(&mut wh);
        for _ in 0..10 {
            repo.add_rack(&mut rng, today(), &spawn);
        }
        let racks = repo.list().to_vec();
        let detector = CollisionDetector::default();
        for rack in &racks {
            let p = FloorPoint::new(rack.position.x, rack.position.z);
            assert!(!detector.is_colliding(p, rack, &racks));
        }
    }

    #[test]
    fn test_bags_per_level_clamped() {
        let mut wh = warehouse();
        let mut rng = StdRng::seed_from_u64(2);
        let mut repo = RackRepository::new(&mut wh);
        let id = repo.add_rack(&mut rng, today(), &SpawnSettings::default()).id.clone();
        assert_eq!(repo.set_bags_per_level(&id, 0).map(|r| r.bags_per_level), Some(1));
    }
}
