// src/models/warehouse.rs
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::rack::Rack;

/// A named container owning an ordered set of racks (creation order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub racks: Vec<Rack>,
}

impl Warehouse {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            racks: Vec::new(),
        }
    }

    pub fn rack(&self, rack_id: &str) -> Option<&Rack> {
        self.racks.iter().find(|r| r.id == rack_id)
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Name cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

// ==================== REQUESTS ====================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseRequest {
    #[validate(
        length(min = 1, max = 100, message = "Warehouse name must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameWarehouseRequest {
    #[validate(
        length(min = 1, max = 100, message = "Warehouse name must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}
