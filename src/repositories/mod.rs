// src/repositories/mod.rs
//! In-memory owners of the warehouse and rack collections.
//!
//! Nothing outside these repositories mutates warehouse or rack fields.
//! Durable storage is layered on top through [`crate::store`].

use uuid::Uuid;

pub mod rack_repository;
pub mod warehouse_repository;

pub use rack_repository::{RackRepository, SpawnSettings};
pub use warehouse_repository::WarehouseRepository;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
