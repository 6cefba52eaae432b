// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_not_blank, validate_not_negative};
use crate::db::collection_store::Document;

// --- Item de estoque (equipamentos, materiais) ---
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: Decimal, // Sempre >= 0
    pub unit: String,      // "adet", "kg", "m"...
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for InventoryItem {
    const COLLECTION: &'static str = "inventory";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)] // Se o JSON não tiver esse campo, assume 0
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_blank"))]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Option<Decimal>,

    #[validate(custom(function = "validate_not_blank"))]
    pub unit: Option<String>,
}

impl InventoryItemUpdate {
    pub fn apply_to(self, item: &mut InventoryItem) {
        if let Some(v) = self.name {
            item.name = v.trim().to_string();
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = self.unit {
            item.unit = v.trim().to_string();
        }
    }
}
