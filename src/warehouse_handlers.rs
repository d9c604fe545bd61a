// src/warehouse_handlers.rs
//! Warehouse CRUD, selection and statistics.

use actix_web::{web, HttpResponse};
use log::info;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::{today, with_engine, ApiResponse};
use crate::models::{CreateWarehouseRequest, RenameWarehouseRequest, Warehouse};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseList {
    pub warehouses: Vec<Warehouse>,
    pub selected_warehouse_id: Option<String>,
}

// ==================== LIST / GET ====================

pub async fn list_warehouses(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let list = with_engine(&app_state, |engine| WarehouseList {
        warehouses: engine.warehouses().to_vec(),
        selected_warehouse_id: engine.session().selected_warehouse_id().map(str::to_string),
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}

pub async fn get_warehouse(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let warehouse = with_engine(&app_state, |engine| engine.warehouse(&warehouse_id).cloned())?
        .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(warehouse)))
}

// ==================== CREATE ====================

pub async fn create_warehouse(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<CreateWarehouseRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let created = with_engine(&app_state, |engine| engine.add_warehouse(&request.name))?;
    app_state.store.save_warehouse(&created).await?;

    info!("Warehouse created: {} ({})", created.name, created.id);
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        created,
        "Warehouse created successfully".to_string(),
    )))
}

// ==================== RENAME ====================

pub async fn rename_warehouse(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    request: web::Json<RenameWarehouseRequest>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();
    request.validate()?;

    let renamed = with_engine(&app_state, |engine| {
        engine.rename_warehouse(&warehouse_id, &request.name)
    })?
    .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))?;

    app_state.store.rename_warehouse(&renamed.id, &renamed.name).await?;

    info!("Warehouse renamed: {} -> {}", renamed.id, renamed.name);
    Ok(HttpResponse::Ok().json(ApiResponse::success(renamed)))
}

// ==================== DELETE ====================

pub async fn delete_warehouse(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let removed = with_engine(&app_state, |engine| {
        if engine.warehouse(&warehouse_id).is_none() {
            return Err(ApiError::warehouse_not_found(&warehouse_id));
        }
        if engine.warehouses().len() <= 1 {
            return Err(ApiError::cannot_delete_last_warehouse());
        }
        engine
            .delete_warehouse(&warehouse_id)
            .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))
    })??;

    app_state.store.delete_warehouse(&removed.id).await?;

    info!("Warehouse deleted: {} ({} racks)", removed.id, removed.racks.len());
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        (),
        "Warehouse deleted successfully".to_string(),
    )))
}

// ==================== SELECT / STATS ====================

pub async fn select_warehouse(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let selected = with_engine(&app_state, |engine| engine.select_warehouse(&warehouse_id))?;
    if !selected {
        return Err(ApiError::warehouse_not_found(&warehouse_id));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        warehouse_id,
        "Warehouse selected".to_string(),
    )))
}

pub async fn get_warehouse_stats(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let warehouse_id = path.into_inner();

    let stats = with_engine(&app_state, |engine| engine.stats(&warehouse_id, today()))?
        .ok_or_else(|| ApiError::warehouse_not_found(&warehouse_id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_routes;
    use crate::handlers::test_support::{active_warehouse_id, app_state};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_create_select_and_delete_warehouse() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/warehouses")
            .set_json(json!({ "name": "Annex" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let annex = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(active_warehouse_id(&state), annex);

        // persisted through the store
        assert_eq!(state.store.load_warehouses().await.unwrap().len(), 2);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/warehouses/{}", annex))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(state.store.load_warehouses().await.unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_last_warehouse_cannot_be_deleted() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let only = active_warehouse_id(&state);
        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/warehouses/{}", only))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_rt::test]
    async fn test_blank_names_are_rejected() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/warehouses")
            .set_json(json!({ "name": "   " }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let id = active_warehouse_id(&state);
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/warehouses/{}", id))
            .set_json(json!({ "name": "" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[actix_rt::test]
    async fn test_unknown_warehouse_is_404() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        for uri in ["/api/v1/warehouses/W-404", "/api/v1/warehouses/W-404/stats"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_rt::test]
    async fn test_stats_for_empty_warehouse() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let id = active_warehouse_id(&state);
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/warehouses/{}/stats", id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["totalRacks"], 0);
        assert_eq!(body["data"]["usagePercent"], 0.0);
    }
}
