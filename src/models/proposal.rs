// src/models/proposal.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{double_option, validate_not_blank, validate_not_negative};
use crate::db::collection_store::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProposalStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Rejected,
    Invoiced,
}

/// Linha de serviço de uma proposta. `total` é sempre `qty * unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalLine {
    pub name: String,
    pub qty: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTopic {
    pub title: String,
    pub services: Vec<ProposalLine>,
}

impl ProposalTopic {
    pub fn total(&self) -> Decimal {
        self.services.iter().map(|s| s.total).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    pub customer_name: String,
    pub project_name: String,
    pub date: NaiveDate,
    pub topics: Vec<ProposalTopic>,
    // Derivado: soma dos tópicos menos o desconto. Nunca vem do cliente.
    pub total_amount: Decimal,
    pub status: ProposalStatus,
    pub discount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Proposal {
    const COLLECTION: &'static str = "proposals";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Proposal {
    pub fn subtotal(&self) -> Decimal {
        self.topics.iter().map(ProposalTopic::total).sum()
    }

    /// Recalcula os totais de linha e o total geral.
    /// Falha se o desconto for maior que o subtotal.
    pub fn recompute(&mut self) -> Result<(), String> {
        for topic in &mut self.topics {
            for line in &mut topic.services {
                line.total = line.qty * line.unit_price;
            }
        }
        let subtotal = self.subtotal();
        let discount = self.discount.unwrap_or(Decimal::ZERO);
        if discount > subtotal {
            return Err(format!(
                "Desconto ({}) maior que o subtotal ({})",
                discount, subtotal
            ));
        }
        self.total_amount = subtotal - discount;
        Ok(())
    }
}

// ---
// Payloads
// ---
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalLineInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub qty: Decimal,

    #[serde(default)]
    pub unit: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTopicInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,

    #[validate(nested)]
    #[serde(default)]
    pub services: Vec<ProposalLineInput>,
}

impl From<ProposalTopicInput> for ProposalTopic {
    fn from(input: ProposalTopicInput) -> Self {
        ProposalTopic {
            title: input.title.trim().to_string(),
            services: input
                .services
                .into_iter()
                .map(|l| ProposalLine {
                    name: l.name.trim().to_string(),
                    total: l.qty * l.unit_price,
                    qty: l.qty,
                    unit: l.unit,
                    unit_price: l.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProposal {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub project_name: String,

    pub date: NaiveDate,

    #[validate(nested)]
    #[serde(default)]
    pub topics: Vec<ProposalTopicInput>,

    #[validate(custom(function = "validate_not_negative"))]
    pub discount: Option<Decimal>,

    #[serde(default)]
    pub status: ProposalStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub project_name: Option<String>,

    pub date: Option<NaiveDate>,

    #[validate(nested)]
    pub topics: Option<Vec<ProposalTopicInput>>,

    #[serde(default, deserialize_with = "double_option")]
    pub discount: Option<Option<Decimal>>,

    pub status: Option<ProposalStatus>,
}

impl ProposalUpdate {
    pub fn apply_to(self, proposal: &mut Proposal) -> Result<(), String> {
        if let Some(Some(d)) = self.discount {
            if d.is_sign_negative() && !d.is_zero() {
                return Err("O desconto não pode ser negativo.".into());
            }
        }
        if let Some(v) = self.customer_name {
            proposal.customer_name = v.trim().to_string();
        }
        if let Some(v) = self.project_name {
            proposal.project_name = v.trim().to_string();
        }
        if let Some(v) = self.date {
            proposal.date = v;
        }
        if let Some(v) = self.topics {
            proposal.topics = v.into_iter().map(ProposalTopic::from).collect();
        }
        if let Some(v) = self.discount {
            proposal.discount = v;
        }
        if let Some(v) = self.status {
            proposal.status = v;
        }
        proposal.recompute()
    }
}
