// src/sync.rs
//! Realtime sync: every snapshot the store publishes replaces the engine's
//! warehouses wholesale, then the session is reconciled.

use std::sync::Arc;

use log::{error, info};

use crate::AppState;

/// Runs until the store drops its publisher or the engine lock is poisoned.
pub async fn run_realtime_sync(state: Arc<AppState>) {
    let mut subscription = state.store.subscribe_warehouses();
    info!("Realtime sync started ({} store)", state.store.backend_name());

    while let Some(snapshot) = subscription.next().await {
        let applied = match state.engine.lock() {
            Ok(mut engine) => {
                // Echoes of our own writes match the engine already. A stale
                // echo can still replace a newer commit until its publish lands.
                if engine.warehouses() != snapshot.as_slice() {
                    engine.apply_snapshot(snapshot);
                }
                true
            }
            Err(_) => false,
        };
        if !applied {
            error!("Realtime sync stopped: layout engine lock poisoned");
            return;
        }
    }

    info!("Realtime sync ended: store closed");
}
