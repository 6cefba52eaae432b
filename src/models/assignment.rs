// src/models/assignment.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{validate_not_blank, validate_positive};
use crate::db::collection_store::Document;

/// Zimmet: itens de estoque entregues a um funcionário numa data.
/// `employee_id` e `items[].inventory_id` são referências fracas (só o id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub items: Vec<AssignmentItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Assignment {
    const COLLECTION: &'static str = "assignments";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentItem {
    #[validate(custom(function = "validate_not_blank"))]
    pub inventory_id: String,

    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

fn validate_items(items: &[AssignmentItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some("Informe ao menos um item.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    #[validate(custom(function = "validate_not_blank"))]
    pub employee_id: String,

    pub date: NaiveDate,

    #[validate(nested, custom(function = "validate_items"))]
    pub items: Vec<AssignmentItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub employee_id: Option<String>,

    pub date: Option<NaiveDate>,

    #[validate(nested, custom(function = "validate_items"))]
    pub items: Option<Vec<AssignmentItem>>,
}

impl AssignmentUpdate {
    pub fn apply_to(self, assignment: &mut Assignment) {
        if let Some(v) = self.employee_id {
            assignment.employee_id = v;
        }
        if let Some(v) = self.date {
            assignment.date = v;
        }
        if let Some(v) = self.items {
            assignment.items = v;
        }
    }
}
