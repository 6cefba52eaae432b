// src/db/assignment_repo.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{integrity, CollectionStore, Document},
    models::{
        assignment::{Assignment, AssignmentUpdate, NewAssignment},
        employee::Employee,
        inventory::InventoryItem,
        new_id,
    },
};

const ENTITY: &str = "Zimmet";

// Zimmets são gravados com funcionários e estoque travados para leitura:
// ninguém exclui um funcionário/item entre a verificação e a gravação.
const WRITES: &[&str] = &[Assignment::COLLECTION];
const REFERENCED: &[&str] = &[Employee::COLLECTION, InventoryItem::COLLECTION];

fn by_date_desc(a: &Assignment, b: &Assignment) -> std::cmp::Ordering {
    b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id))
}

#[derive(Clone)]
pub struct AssignmentRepository {
    store: Arc<CollectionStore>,
}

impl AssignmentRepository {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Assignment>, AppError> {
        let mut assignments = self.store.load::<Assignment>().await?;
        assignments.sort_by(by_date_desc);
        Ok(assignments)
    }

    pub async fn list_for_employee(&self, employee_id: &str) -> Result<Vec<Assignment>, AppError> {
        let mut assignments: Vec<Assignment> = self
            .store
            .load::<Assignment>()
            .await?
            .into_iter()
            .filter(|a| a.employee_id == employee_id)
            .collect();
        assignments.sort_by(by_date_desc);
        Ok(assignments)
    }

    pub async fn get(&self, id: &str) -> Result<Assignment, AppError> {
        self.store
            .find::<Assignment>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    pub async fn create(&self, payload: NewAssignment) -> Result<Assignment, AppError> {
        payload.validate()?;

        self.store
            .transact(WRITES, REFERENCED, move |tx| {
                let employees = tx.load::<Employee>()?;
                let inventory = tx.load::<InventoryItem>()?;
                integrity::check_assignment_references(
                    &employees,
                    &inventory,
                    &payload.employee_id,
                    &payload.items,
                )?;

                let mut assignments = tx.load::<Assignment>()?;
                let now = Utc::now();
                let assignment = Assignment {
                    id: new_id(),
                    employee_id: payload.employee_id,
                    date: payload.date,
                    items: payload.items,
                    created_at: now,
                    updated_at: now,
                };
                assignments.push(assignment.clone());
                tx.stage(&assignments)?;
                Ok(assignment)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: AssignmentUpdate) -> Result<Assignment, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .transact(WRITES, REFERENCED, move |tx| {
                let mut assignments = tx.load::<Assignment>()?;
                let idx = assignments
                    .iter()
                    .position(|a| a.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                let mut updated = assignments[idx].clone();
                patch.apply_to(&mut updated);

                let employees = tx.load::<Employee>()?;
                let inventory = tx.load::<InventoryItem>()?;
                integrity::check_assignment_references(
                    &employees,
                    &inventory,
                    &updated.employee_id,
                    &updated.items,
                )?;

                updated.updated_at = Utc::now();
                assignments[idx] = updated.clone();
                tx.stage(&assignments)?;
                Ok(updated)
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = id.to_string();

        self.store
            .mutate::<Assignment, _, _>(move |assignments| {
                let idx = assignments
                    .iter()
                    .position(|a| a.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                assignments.remove(idx);
                Ok(())
            })
            .await
    }
}
