// src/db/inventory_repo.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{integrity, CollectionStore, Document},
    models::{
        assignment::Assignment,
        inventory::{InventoryItem, InventoryItemUpdate, NewInventoryItem},
        new_id,
    },
};

const ENTITY: &str = "Item de estoque";

#[derive(Clone)]
pub struct InventoryRepository {
    store: Arc<CollectionStore>,
}

impl InventoryRepository {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list(&self) -> Result<Vec<InventoryItem>, AppError> {
        let mut items = self.store.load::<InventoryItem>().await?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> Result<InventoryItem, AppError> {
        self.store
            .find::<InventoryItem>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    // ---
    // Funções de "Escrita"
    // ---

    pub async fn create(&self, payload: NewInventoryItem) -> Result<InventoryItem, AppError> {
        payload.validate()?;

        self.store
            .mutate::<InventoryItem, _, _>(move |items| {
                let now = Utc::now();
                let item = InventoryItem {
                    id: new_id(),
                    name: payload.name.trim().to_string(),
                    quantity: payload.quantity,
                    unit: payload.unit.trim().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                items.push(item.clone());
                Ok(item)
            })
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: InventoryItemUpdate,
    ) -> Result<InventoryItem, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<InventoryItem, _, _>(move |items| {
                let item = items
                    .iter_mut()
                    .find(|i| i.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                patch.apply_to(item);
                item.updated_at = Utc::now();
                Ok(item.clone())
            })
            .await
    }

    /// Itens referenciados por algum zimmet não podem ser excluídos.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = id.to_string();

        self.store
            .transact(
                &[InventoryItem::COLLECTION],
                &[Assignment::COLLECTION],
                move |tx| {
                    let mut items = tx.load::<InventoryItem>()?;
                    let idx = items
                        .iter()
                        .position(|i| i.id == id)
                        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                    let assignments = tx.load::<Assignment>()?;
                    let dependents = integrity::assignments_using_item(&assignments, &id);
                    if dependents > 0 {
                        return Err(AppError::ReferencedEntity {
                            entity: ENTITY,
                            id,
                            dependents,
                        });
                    }

                    items.remove(idx);
                    tx.stage(&items)?;
                    tracing::info!(id = %id, "Item de estoque excluído");
                    Ok(())
                },
            )
            .await
    }
}
