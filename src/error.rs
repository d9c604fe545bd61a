// src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(String),
    ValidationError(String),
    StorageError(StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::StorageError(err) => write!(f, "Storage Error: {}", err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StorageError(_) | ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            message: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        log::error!("Persistence failure: {}", err);
        ApiError::StorageError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }

    pub fn warehouse_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Warehouse with ID '{}' not found", id))
    }

    pub fn rack_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Rack with ID '{}' not found", id))
    }

    pub fn cannot_delete_last_warehouse() -> Self {
        ApiError::Conflict("Cannot delete the last remaining warehouse".to_string())
    }

    pub fn lock_poisoned() -> Self {
        ApiError::InternalServerError("Layout engine lock poisoned".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::rack_not_found("R-1").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::ValidationError("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::cannot_delete_last_warehouse().status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_uses_status_code() {
        let err = ApiError::bad_request("No fields to update");
        let response = err.error_response();
        assert_eq!(response.status(), err.status_code());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().try_into_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Bad Request: No fields to update");
    }

    #[test]
    fn test_messages_name_the_resource() {
        assert_eq!(
            ApiError::warehouse_not_found("W-9").to_string(),
            "Not Found: Warehouse with ID 'W-9' not found"
        );
    }
}
