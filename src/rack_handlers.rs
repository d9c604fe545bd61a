// src/rack_handlers.rs
//! Rack CRUD, sizing, stock and placement within a warehouse.

use actix_web::{web, HttpResponse};
use log::info;
use std::sync::Arc;
use validator::Validate;

use crate::engine::LayoutEngine;
use crate::error::{ApiError, ApiResult};
use crate::geometry::FloorPoint;
use crate::handlers::{persist_rack, today, with_engine, ApiResponse};
use crate::models::{FloorPointRequest, Rack, RackPatch, ResizeRackRequest, SetStockRequest};
use crate::AppState;

/// Resolve a rack mutation: 404 for the warehouse first, then for the rack.
fn rack_result(engine: &LayoutEngine, warehouse_id: &str, rack_id: &str, rack: Option<Rack>) -> ApiResult<Rack> {
    match rack {
        Some(rack) => Ok(rack),
        None if engine.warehouse(warehouse_id).is_none() => Err(ApiError::warehouse_not_found(warehouse_id)),
        None => Err(ApiError::rack_not_found(rack_id)),
    }
}

// ==================== LIST / GET ====================

pub async fn list_racks(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let racks = with_engine(&app_state, |engine| engine.rack_summaries(&warehouse_id, today()))?
        .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(racks)))
}

pub async fn get_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();

    let summary = with_engine(&app_state, |engine| {
        match engine.rack_summary(&warehouse_id, &rack_id, today()) {
            Some(summary) => Ok(summary),
            None if engine.warehouse(&warehouse_id).is_none() => Err(ApiError::warehouse_not_found(&warehouse_id)),
            None => Err(ApiError::rack_not_found(&rack_id)),
        }
    })??;

    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

// ==================== CREATE / DELETE ====================

pub async fn create_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let rack = with_engine(&app_state, |engine| engine.add_rack(&warehouse_id, today()))?
        .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))?;

    app_state.store.add_rack(&warehouse_id, &rack).await?;

    info!("Rack created: {} in warehouse {}", rack.id, warehouse_id);
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        rack,
        "Rack created successfully".to_string(),
    )))
}

pub async fn delete_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();

    let removed = with_engine(&app_state, |engine| {
        let removed = engine.delete_rack(&warehouse_id, &rack_id);
        rack_result(engine, &warehouse_id, &rack_id, removed)
    })??;

    app_state.store.delete_rack(&warehouse_id, &removed.id).await?;

    info!("Rack deleted: {} from warehouse {}", removed.id, warehouse_id);
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        (),
        "Rack deleted successfully".to_string(),
    )))
}

// ==================== UPDATE ====================

pub async fn update_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    patch: web::Json<RackPatch>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();
    patch.validate()?;
    let patch = patch.into_inner();

    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let rack = with_engine(&app_state, |engine| {
        let updated = engine.update_rack(&warehouse_id, &rack_id, &patch);
        rack_result(engine, &warehouse_id, &rack_id, updated)
    })??;

    persist_rack(&app_state, &warehouse_id, &rack, patch).await?;

    info!("Rack updated: {}", rack.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(rack)))
}

pub async fn resize_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    request: web::Json<ResizeRackRequest>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();
    request.validate()?;

    let rack = with_engine(&app_state, |engine| {
        let resized = engine.resize_rack(&warehouse_id, &rack_id, request.width, request.depth);
        rack_result(engine, &warehouse_id, &rack_id, resized)
    })??;

    persist_rack(&app_state, &warehouse_id, &rack, RackPatch::size(rack.width, rack.depth)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rack)))
}

// ==================== STOCK ====================

pub async fn set_stock(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    request: web::Json<SetStockRequest>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();
    request.validate()?;
    let stock = u32::try_from(request.stock)
        .map_err(|_| ApiError::ValidationError("Stock must be a non-negative integer".to_string()))?;

    let rack = with_engine(&app_state, |engine| {
        let updated = engine.set_stock(&warehouse_id, &rack_id, stock);
        rack_result(engine, &warehouse_id, &rack_id, updated)
    })??;

    persist_rack(&app_state, &warehouse_id, &rack, RackPatch::stock(rack.stock)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rack)))
}

pub async fn increment_stock(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();

    let rack = with_engine(&app_state, |engine| {
        let updated = engine.increment_stock(&warehouse_id, &rack_id);
        rack_result(engine, &warehouse_id, &rack_id, updated)
    })??;

    persist_rack(&app_state, &warehouse_id, &rack, RackPatch::stock(rack.stock)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rack)))
}

pub async fn decrement_stock(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();

    let rack = with_engine(&app_state, |engine| {
        let updated = engine.decrement_stock(&warehouse_id, &rack_id);
        rack_result(engine, &warehouse_id, &rack_id, updated)
    })??;

    persist_rack(&app_state, &warehouse_id, &rack, RackPatch::stock(rack.stock)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rack)))
}

// ==================== MOVE ====================

/// Snap, clamp and collision-check a move. A blocked move is a normal
/// response with `moved: false`.
pub async fn move_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    request: web::Json<FloorPointRequest>,
) -> ApiResult<HttpResponse> {
    let (warehouse_id, rack_id) = path.into_inner();
    let target = FloorPoint::new(request.x, request.z);

    let outcome = with_engine(&app_state, |engine| {
        match engine.move_rack_to(&warehouse_id, &rack_id, target) {
            Some(outcome) => Ok(outcome),
            None if engine.warehouse(&warehouse_id).is_none() => Err(ApiError::warehouse_not_found(&warehouse_id)),
            None => Err(ApiError::rack_not_found(&rack_id)),
        }
    })??;

    if outcome.moved {
        persist_rack(&app_state, &warehouse_id, &outcome.rack, RackPatch::position(outcome.position)).await?;
    } else {
        info!("Move of rack {} blocked by {:?}", rack_id, outcome.colliding_with);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}
