// src/repositories/warehouse_repository.rs
//! The set of warehouses, in creation order. Each warehouse's racks are
//! reached through a scoped [`RackRepository`].

use super::new_id;
use super::rack_repository::RackRepository;
use crate::models::{Rack, Warehouse};

#[derive(Debug, Clone, Default)]
pub struct WarehouseRepository {
    warehouses: Vec<Warehouse>,
}

impl WarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(warehouses: Vec<Warehouse>) -> Self {
        Self { warehouses }
    }

    pub fn list(&self) -> &[Warehouse] {
        &self.warehouses
    }

    pub fn len(&self) -> usize {
        self.warehouses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warehouses.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| w.id == id)
    }

    pub fn first(&self) -> Option<&Warehouse> {
        self.warehouses.first()
    }

    pub fn racks(&self, id: &str) -> Option<&[Rack]> {
        self.get(id).map(|w| w.racks.as_slice())
    }

    pub fn racks_mut(&mut self, id: &str) -> Option<RackRepository<'_>> {
        self.warehouses
            .iter_mut()
            .find(|w| w.id == id)
            .map(RackRepository::new)
    }

    /// Create an empty warehouse. Name validation is the caller's job.
    pub fn add_warehouse(&mut self, name: &str) -> &Warehouse {
        self.warehouses.push(Warehouse::new(new_id(), name.to_string()));
        let last = self.warehouses.len() - 1;
        &self.warehouses[last]
    }

    pub fn rename_warehouse(&mut self, id: &str, name: &str) -> Option<&Warehouse> {
        let wh = self.warehouses.iter_mut().find(|w| w.id == id)?;
        wh.name = name.to_string();
        Some(wh)
    }

    /// Remove a warehouse with all of its racks. The last-warehouse guard
    /// lives with the caller.
    pub fn delete_warehouse(&mut self, id: &str) -> Option<Warehouse> {
        let idx = self.warehouses.iter().position(|w| w.id == id)?;
        Some(self.warehouses.remove(idx))
    }

    /// Swap in a complete snapshot in one step.
    pub fn replace_all(&mut self, warehouses: Vec<Warehouse>) {
        self.warehouses = warehouses;
    }
}
