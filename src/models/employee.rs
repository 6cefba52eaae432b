// src/models/employee.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{attachment::StoredFile, double_option, validate_not_blank};
use crate::db::collection_store::Document;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub full_name: String,
    // Único entre ativos e inativos
    pub national_id: String,
    pub birth_date: NaiveDate,
    pub social_security_no: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub phone: String,
    #[serde(default)]
    pub documents: Vec<StoredFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Employee {
    const COLLECTION: &'static str = "employees";

    fn id(&self) -> &str {
        &self.id
    }
}

fn default_true() -> bool {
    true
}

fn validate_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    if let Some(end) = end {
        if end < start {
            let mut err = ValidationError::new("period");
            err.message = Some("A data de saída não pode ser anterior à de admissão.".into());
            return Err(err);
        }
    }
    Ok(())
}

fn validate_new_employee(payload: &NewEmployee) -> Result<(), ValidationError> {
    validate_period(payload.start_date, payload.end_date)
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_employee"))]
pub struct NewEmployee {
    #[validate(custom(function = "validate_not_blank"))]
    pub full_name: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub national_id: String,

    pub birth_date: NaiveDate,

    #[serde(default)]
    pub social_security_no: String,

    pub start_date: NaiveDate,

    pub end_date: Option<NaiveDate>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub phone: String,
}

/// Campos que podem ser alterados depois da criação.
/// id, documentos e datas de auditoria ficam de fora de propósito.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub full_name: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub national_id: Option<String>,

    pub birth_date: Option<NaiveDate>,

    pub social_security_no: Option<String>,

    pub start_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,

    pub is_active: Option<bool>,

    pub phone: Option<String>,
}

impl EmployeeUpdate {
    pub fn apply_to(self, employee: &mut Employee) -> Result<(), ValidationError> {
        if let Some(v) = self.full_name {
            employee.full_name = v.trim().to_string();
        }
        if let Some(v) = self.national_id {
            employee.national_id = v.trim().to_string();
        }
        if let Some(v) = self.birth_date {
            employee.birth_date = v;
        }
        if let Some(v) = self.social_security_no {
            employee.social_security_no = v;
        }
        if let Some(v) = self.start_date {
            employee.start_date = v;
        }
        if let Some(v) = self.end_date {
            employee.end_date = v;
        }
        if let Some(v) = self.is_active {
            employee.is_active = v;
        }
        if let Some(v) = self.phone {
            employee.phone = v;
        }
        validate_period(employee.start_date, employee.end_date)
    }
}
