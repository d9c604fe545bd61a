// src/session_handlers.rs
//! Selection, edit mode and pointer-driven drag of the active layout session.

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::LayoutEngine;
use crate::error::{ApiError, ApiResult};
use crate::geometry::FloorPoint;
use crate::handlers::{persist_rack, with_engine, ApiResponse};
use crate::models::{FloorPointRequest, Position, RackPatch};
use crate::session::{DragUpdate, DropOutcome, SessionState};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionState,
    pub selected_warehouse_id: Option<String>,
    pub selected_rack_id: Option<String>,
    pub edit_mode: bool,
    pub drag_preview_position: Option<Position>,
}

impl SessionView {
    fn of(engine: &LayoutEngine) -> Self {
        let session = engine.session();
        Self {
            state: session.state(),
            selected_warehouse_id: session.selected_warehouse_id().map(str::to_string),
            selected_rack_id: session.selected_rack_id().map(str::to_string),
            edit_mode: session.edit_mode(),
            drag_preview_position: session.drag_preview(),
        }
    }
}

/// `enabled` absent toggles.
#[derive(Debug, Default, Deserialize)]
pub struct EditModeRequest {
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DragResponse<T> {
    pub outcome: T,
    pub session: SessionView,
}

pub async fn get_session(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let view = with_engine(&app_state, |engine| SessionView::of(engine))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

pub async fn set_edit_mode(
    app_state: web::Data<Arc<AppState>>,
    request: Option<web::Json<EditModeRequest>>,
) -> ApiResult<HttpResponse> {
    let enabled = request.and_then(|r| r.enabled);

    let view = with_engine(&app_state, |engine| {
        match enabled {
            Some(enabled) => engine.set_edit_mode(enabled),
            None => {
                engine.toggle_edit_mode();
            }
        }
        SessionView::of(engine)
    })?;

    info!("Edit mode {}", if view.edit_mode { "on" } else { "off" });
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

pub async fn pick_rack(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let rack_id = path.into_inner();

    let view = with_engine(&app_state, |engine| {
        if engine.pick_rack(&rack_id) {
            Ok(SessionView::of(engine))
        } else {
            Err(ApiError::rack_not_found(&rack_id))
        }
    })??;

    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

pub async fn clear_selection(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let view = with_engine(&app_state, |engine| {
        engine.clear_selection();
        SessionView::of(engine)
    })?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

// ==================== POINTER ====================

pub async fn pointer_down(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let response = with_engine(&app_state, |engine| {
        let dragging = engine.pointer_down();
        DragResponse {
            outcome: dragging,
            session: SessionView::of(engine),
        }
    })?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

pub async fn pointer_move(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<FloorPointRequest>,
) -> ApiResult<HttpResponse> {
    let raw = FloorPoint::new(request.x, request.z);

    let response = with_engine(&app_state, |engine| {
        let update: DragUpdate = engine.pointer_move(raw);
        DragResponse {
            outcome: update,
            session: SessionView::of(engine),
        }
    })?;

    debug!("Pointer move to ({}, {}): {:?}", raw.x, raw.z, response.outcome);
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Ends a drag; a committed drop is persisted like any other move.
pub async fn pointer_up(
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let (response, moved) = with_engine(&app_state, |engine| {
        let (outcome, rack) = engine.pointer_up();
        let moved = rack.zip(engine.session().selected_warehouse_id().map(str::to_string));
        let response = DragResponse {
            outcome,
            session: SessionView::of(engine),
        };
        (response, moved)
    })?;

    if let (DropOutcome::Committed { position, .. }, Some((rack, warehouse_id))) = (&response.outcome, moved) {
        persist_rack(&app_state, &warehouse_id, &rack, RackPatch::position(*position)).await?;
        info!("Rack {} dropped at ({}, {})", rack.id, position.x, position.z);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{active_warehouse_id, app_state};
    use crate::handlers::{configure_routes, today};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_drag_round_trip_persists_position() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;
        let wid = active_warehouse_id(&state);
        let rack = state.engine.lock().unwrap().add_rack(&wid, today()).unwrap();
        state.store.add_rack(&wid, &rack).await.unwrap();

        // pointer down without edit mode does nothing
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/session/racks/{}/pick", rack.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "rack_selected");
        let req = test::TestRequest::post().uri("/api/v1/session/pointer/down").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["outcome"], false);

        let req = test::TestRequest::post()
            .uri("/api/v1/session/edit-mode")
            .set_json(json!({ "enabled": true }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["editMode"], true);

        let req = test::TestRequest::post().uri("/api/v1/session/pointer/down").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["session"]["state"], "dragging");

        let req = test::TestRequest::post()
            .uri("/api/v1/session/pointer/move")
            .set_json(json!({ "x": -20.7, "z": 19.2 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["outcome"]["result"], "accepted");
        assert_eq!(body["data"]["outcome"]["position"], json!([-20.0, 1.0, 20.0]));

        let req = test::TestRequest::post().uri("/api/v1/session/pointer/up").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["outcome"]["result"], "committed");
        assert_eq!(body["data"]["session"]["state"], "rack_selected");

        let stored = &state.store.load_racks(&wid).await.unwrap()[0];
        assert_eq!(stored.position, Position::on_floor(-20.0, 20.0));
    }

    #[actix_rt::test]
    async fn test_edit_mode_toggle_and_clear() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/session/edit-mode").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["editMode"], true);

        let req = test::TestRequest::post().uri("/api/v1/session/clear").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["state"], "idle");
        assert_eq!(body["data"]["selectedRackId"], Value::Null);

        let req = test::TestRequest::post()
            .uri("/api/v1/session/racks/R-404/pick")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
