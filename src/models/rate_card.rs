// src/models/rate_card.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{attachment::StoredFile, double_option, new_id, validate_not_blank};
use crate::db::collection_store::Document;

/// Tabela de preços de um cliente: categorias -> serviços -> preço unitário.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateCard {
    pub id: String,
    // Único (sem diferenciar maiúsculas) entre as tabelas existentes
    pub customer_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub categories: Vec<RateCategory>,
    // Planilha original quando a tabela veio de um upload
    #[serde(default)]
    pub source_file: Option<StoredFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for RateCard {
    const COLLECTION: &'static str = "ratecards";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateCategory {
    pub id: String,
    pub name: String,
    pub services: Vec<RateService>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateService {
    pub id: String,
    pub name: String,
    pub price: Decimal,
}

/// Chave de unicidade do cliente: sem caixa, mas com acentos ("Şen" != "Sen").
/// 'İ' vira 'i' antes de `to_lowercase`, que produziria "i̇".
pub fn customer_key(name: &str) -> String {
    name.trim().replace('İ', "i").to_lowercase()
}

impl RateCard {
    pub fn service_count(&self) -> usize {
        self.categories.iter().map(|c| c.services.len()).sum()
    }
}

// ---
// Payloads (também é o formato de saída do preview de planilha)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateServiceInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateCategoryInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(nested)]
    #[serde(default)]
    pub services: Vec<RateServiceInput>,
}

impl From<RateCategoryInput> for RateCategory {
    fn from(input: RateCategoryInput) -> Self {
        RateCategory {
            id: input.id.filter(|s| !s.trim().is_empty()).unwrap_or_else(new_id),
            name: input.name.trim().to_string(),
            services: input
                .services
                .into_iter()
                .map(|s| RateService {
                    id: s.id.filter(|s| !s.trim().is_empty()).unwrap_or_else(new_id),
                    name: s.name.trim().to_string(),
                    price: s.price,
                })
                .collect(),
        }
    }
}

impl From<&RateCategory> for RateCategoryInput {
    fn from(category: &RateCategory) -> Self {
        RateCategoryInput {
            id: Some(category.id.clone()),
            name: category.name.clone(),
            services: category
                .services
                .iter()
                .map(|s| RateServiceInput {
                    id: Some(s.id.clone()),
                    name: s.name.clone(),
                    price: s.price,
                })
                .collect(),
        }
    }
}

fn validate_dates(payload: &NewRateCard) -> Result<(), ValidationError> {
    validate_range(payload.start_date, payload.end_date)
}

pub(crate) fn validate_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            let mut err = ValidationError::new("period");
            err.message = Some("A data final não pode ser anterior à inicial.".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_dates"))]
pub struct NewRateCard {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: String,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    #[validate(nested)]
    #[serde(default)]
    pub categories: Vec<RateCategoryInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateCardUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,

    #[validate(nested)]
    pub categories: Option<Vec<RateCategoryInput>>,
}

impl RateCardUpdate {
    pub fn apply_to(self, card: &mut RateCard) -> Result<(), ValidationError> {
        if let Some(v) = self.customer_name {
            card.customer_name = v.trim().to_string();
        }
        if let Some(v) = self.start_date {
            card.start_date = v;
        }
        if let Some(v) = self.end_date {
            card.end_date = v;
        }
        if let Some(v) = self.categories {
            card.categories = v.into_iter().map(RateCategory::from).collect();
        }
        validate_range(card.start_date, card.end_date)
    }
}
