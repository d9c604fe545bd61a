// src/handlers.rs
//! Shared handler plumbing: response envelope, engine access, route table.

use actix_web::web;
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::engine::LayoutEngine;
use crate::error::{ApiError, ApiResult};
use crate::models::{Rack, RackPatch};
use crate::{monitoring, rack_handlers, session_handlers, warehouse_handlers, AppState};

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

// ==================== ENGINE ACCESS ====================

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Run `f` under the engine lock. The guard never outlives this call, so
/// nothing awaits while holding it.
pub fn with_engine<T>(state: &AppState, f: impl FnOnce(&mut LayoutEngine) -> T) -> ApiResult<T> {
    let mut engine = state.engine.lock().map_err(|_| ApiError::lock_poisoned())?;
    Ok(f(&mut engine))
}

/// Persist a rack change already committed to the engine.
pub async fn persist_rack(state: &AppState, warehouse_id: &str, rack: &Rack, patch: RackPatch) -> ApiResult<()> {
    state.store.update_rack(warehouse_id, &rack.id, &patch).await?;
    Ok(())
}

// ==================== ROUTES ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(monitoring::health_check))
            .route("/ready", web::get().to(monitoring::readiness_check)),
    )
    .service(
        web::scope("/api/v1")
            .service(
                web::scope("/warehouses")
                    .route("", web::get().to(warehouse_handlers::list_warehouses))
                    .route("", web::post().to(warehouse_handlers::create_warehouse))
                    .route("/{id}", web::get().to(warehouse_handlers::get_warehouse))
                    .route("/{id}", web::put().to(warehouse_handlers::rename_warehouse))
                    .route("/{id}", web::delete().to(warehouse_handlers::delete_warehouse))
                    .route("/{id}/select", web::post().to(warehouse_handlers::select_warehouse))
                    .route("/{id}/stats", web::get().to(warehouse_handlers::get_warehouse_stats))
                    .route("/{id}/racks", web::get().to(rack_handlers::list_racks))
                    .route("/{id}/racks", web::post().to(rack_handlers::create_rack))
                    .route("/{id}/racks/{rack_id}", web::get().to(rack_handlers::get_rack))
                    .route("/{id}/racks/{rack_id}", web::patch().to(rack_handlers::update_rack))
                    .route("/{id}/racks/{rack_id}", web::delete().to(rack_handlers::delete_rack))
                    .route("/{id}/racks/{rack_id}/size", web::put().to(rack_handlers::resize_rack))
                    .route("/{id}/racks/{rack_id}/stock", web::put().to(rack_handlers::set_stock))
                    .route(
                        "/{id}/racks/{rack_id}/stock/increment",
                        web::post().to(rack_handlers::increment_stock),
                    )
                    .route(
                        "/{id}/racks/{rack_id}/stock/decrement",
                        web::post().to(rack_handlers::decrement_stock),
                    )
                    .route("/{id}/racks/{rack_id}/move", web::post().to(rack_handlers::move_rack)),
            )
            .service(
                web::scope("/session")
                    .route("", web::get().to(session_handlers::get_session))
                    .route("/edit-mode", web::post().to(session_handlers::set_edit_mode))
                    .route("/racks/{rack_id}/pick", web::post().to(session_handlers::pick_rack))
                    .route("/clear", web::post().to(session_handlers::clear_selection))
                    .route("/pointer/down", web::post().to(session_handlers::pointer_down))
                    .route("/pointer/move", web::post().to(session_handlers::pointer_move))
                    .route("/pointer/up", web::post().to(session_handlers::pointer_up)),
            ),
    );
}
