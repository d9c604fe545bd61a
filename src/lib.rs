// src/lib.rs
//! Warehouse floor-plan layout and rack inventory engine.
//!
//! The core (`geometry`, `collision`, `inventory`, `repositories`, `session`,
//! `engine`) is synchronous and I/O free. `store` persists it; the handler
//! modules expose it over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Instant;

pub mod collision;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod handlers;
pub mod inventory;
pub mod models;
pub mod monitoring;
pub mod rack_handlers;
pub mod repositories;
pub mod session;
pub mod session_handlers;
pub mod store;
pub mod sync;
pub mod warehouse_handlers;

use config::Config;
use engine::LayoutEngine;
use store::WarehouseStore;

/// Shared application state. Handlers lock `engine` only for synchronous
/// work and persist through `store` after releasing it.
pub struct AppState {
    pub engine: Mutex<LayoutEngine>,
    pub store: Arc<dyn WarehouseStore>,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: LayoutEngine, store: Arc<dyn WarehouseStore>, config: Config) -> Self {
        Self {
            engine: Mutex::new(engine),
            store,
            config,
            started_at: Instant::now(),
        }
    }
}
