// src/db/proposal_repo.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::CollectionStore,
    models::{
        new_id,
        proposal::{NewProposal, Proposal, ProposalStatus, ProposalTopic, ProposalUpdate},
    },
};

const ENTITY: &str = "Proposta";

#[derive(Clone)]
pub struct ProposalRepository {
    store: Arc<CollectionStore>,
}

impl ProposalRepository {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    /// Mais recentes primeiro.
    pub async fn list(&self) -> Result<Vec<Proposal>, AppError> {
        let mut proposals = self.store.load::<Proposal>().await?;
        proposals.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(proposals)
    }

    pub async fn get(&self, id: &str) -> Result<Proposal, AppError> {
        self.store
            .find::<Proposal>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    pub async fn create(&self, payload: NewProposal) -> Result<Proposal, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let mut proposal = Proposal {
            id: new_id(),
            customer_name: payload.customer_name.trim().to_string(),
            project_name: payload.project_name.trim().to_string(),
            date: payload.date,
            topics: payload.topics.into_iter().map(ProposalTopic::from).collect(),
            total_amount: Decimal::ZERO,
            status: payload.status,
            discount: payload.discount,
            created_at: now,
            updated_at: now,
        };
        proposal.recompute().map_err(AppError::Validation)?;

        self.store
            .mutate::<Proposal, _, _>(move |proposals| {
                proposals.push(proposal.clone());
                Ok(proposal)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: ProposalUpdate) -> Result<Proposal, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<Proposal, _, _>(move |proposals| {
                let idx = proposals
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                let mut updated = proposals[idx].clone();
                patch.apply_to(&mut updated).map_err(AppError::Validation)?;
                updated.updated_at = Utc::now();
                proposals[idx] = updated.clone();
                Ok(updated)
            })
            .await
    }

    pub async fn set_status(&self, id: &str, status: ProposalStatus) -> Result<Proposal, AppError> {
        self.update(
            id,
            ProposalUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = id.to_string();

        self.store
            .mutate::<Proposal, _, _>(move |proposals| {
                let idx = proposals
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                proposals.remove(idx);
                Ok(())
            })
            .await
    }
}
