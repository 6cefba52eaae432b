// src/db/rate_card_repo.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{BlobStore, CollectionStore, DeleteReport},
    models::{
        attachment::StoredFile,
        new_id,
        rate_card::{customer_key, NewRateCard, RateCard, RateCardUpdate, RateCategory},
    },
    services::spreadsheet_import,
};

const ENTITY: &str = "Tabela de preços";

/// Resultado por cliente de uma importação de planilha.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub customer_name: String,
    pub rate_card_id: Option<String>,
    pub created: bool,
    pub source_attached: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct RateCardRepository {
    store: Arc<CollectionStore>,
    attachments: Arc<dyn BlobStore>,
}

// "ACME", "Acme " e "acme" são o mesmo cliente; "Şen" e "Sen" não.
fn same_customer(a: &str, b: &str) -> bool {
    customer_key(a) == customer_key(b)
}

fn ensure_unique_customer(
    cards: &[RateCard],
    customer_name: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    let taken = cards
        .iter()
        .any(|c| same_customer(&c.customer_name, customer_name) && Some(c.id.as_str()) != except_id);
    if taken {
        return Err(AppError::Conflict(format!(
            "Já existe uma tabela de preços para o cliente '{}'",
            customer_name.trim()
        )));
    }
    Ok(())
}

fn build_card(payload: NewRateCard, now: DateTime<Utc>) -> RateCard {
    RateCard {
        id: new_id(),
        customer_name: payload.customer_name.trim().to_string(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        categories: payload.categories.into_iter().map(RateCategory::from).collect(),
        source_file: None,
        created_at: now,
        updated_at: now,
    }
}

impl RateCardRepository {
    pub fn new(store: Arc<CollectionStore>, attachments: Arc<dyn BlobStore>) -> Self {
        Self { store, attachments }
    }

    pub async fn list(&self) -> Result<Vec<RateCard>, AppError> {
        let mut cards = self.store.load::<RateCard>().await?;
        cards.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(cards)
    }

    pub async fn get(&self, id: &str) -> Result<RateCard, AppError> {
        self.store
            .find::<RateCard>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    pub async fn find_by_customer(&self, customer_name: &str) -> Result<Option<RateCard>, AppError> {
        Ok(self
            .store
            .load::<RateCard>()
            .await?
            .into_iter()
            .find(|c| same_customer(&c.customer_name, customer_name)))
    }

    pub async fn create(&self, payload: NewRateCard) -> Result<RateCard, AppError> {
        payload.validate()?;

        self.store
            .mutate::<RateCard, _, _>(move |cards| {
                ensure_unique_customer(cards, &payload.customer_name, None)?;
                let card = build_card(payload, Utc::now());
                cards.push(card.clone());
                tracing::info!(id = %card.id, customer = %card.customer_name, "Tabela de preços criada");
                Ok(card)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: RateCardUpdate) -> Result<RateCard, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<RateCard, _, _>(move |cards| {
                let idx = cards
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                let mut updated = cards[idx].clone();
                patch
                    .apply_to(&mut updated)
                    .map_err(|e| AppError::validation(e.to_string()))?;
                ensure_unique_customer(cards, &updated.customer_name, Some(&id))?;

                updated.updated_at = Utc::now();
                cards[idx] = updated.clone();
                Ok(updated)
            })
            .await
    }

    /// Remove a tabela e o diretório de anexos dela.
    pub async fn delete(&self, id: &str) -> Result<DeleteReport, AppError> {
        let owned_id = id.to_string();

        self.store
            .mutate::<RateCard, _, _>(move |cards| {
                let idx = cards
                    .iter()
                    .position(|c| c.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                cards.remove(idx);
                Ok(())
            })
            .await?;

        let attachments_removed = match self.attachments.delete_owner(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id, error = %e, "Anexos da tabela de preços não puderam ser removidos");
                false
            }
        };

        Ok(DeleteReport {
            id: id.to_string(),
            removed_dependents: 0,
            attachments_removed,
        })
    }

    /// Cria ou substitui tabelas vindas de uma importação, uma por cliente.
    /// Cliente já existente: categorias e datas são substituídas.
    /// Erros de um cliente não impedem os demais.
    pub async fn upsert_many(&self, drafts: Vec<NewRateCard>) -> Result<Vec<ImportOutcome>, AppError> {
        self.store
            .mutate::<RateCard, _, _>(move |cards| {
                let now = Utc::now();
                let mut outcomes = Vec::with_capacity(drafts.len());

                for draft in drafts {
                    let customer_name = draft.customer_name.trim().to_string();
                    if let Err(e) = draft.validate() {
                        outcomes.push(ImportOutcome {
                            customer_name,
                            rate_card_id: None,
                            created: false,
                            source_attached: false,
                            error: Some(AppError::from(e).to_string()),
                        });
                        continue;
                    }

                    match cards
                        .iter_mut()
                        .find(|c| same_customer(&c.customer_name, &draft.customer_name))
                    {
                        Some(existing) => {
                            existing.start_date = draft.start_date;
                            existing.end_date = draft.end_date;
                            existing.categories =
                                draft.categories.into_iter().map(RateCategory::from).collect();
                            existing.updated_at = now;
                            outcomes.push(ImportOutcome {
                                customer_name,
                                rate_card_id: Some(existing.id.clone()),
                                created: false,
                                source_attached: false,
                                error: None,
                            });
                        }
                        None => {
                            let card = build_card(draft, now);
                            outcomes.push(ImportOutcome {
                                customer_name,
                                rate_card_id: Some(card.id.clone()),
                                created: true,
                                source_attached: false,
                                error: None,
                            });
                            cards.push(card);
                        }
                    }
                }
                Ok(outcomes)
            })
            .await
    }

    /// Importa uma planilha enviada (um ou mais clientes) e guarda o arquivo
    /// original em cada tabela afetada. Preço ilegível rejeita o arquivo inteiro.
    pub async fn import_upload(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Vec<ImportOutcome>, AppError> {
        let drafts = spreadsheet_import::parse_upload(bytes)?;
        let mut outcomes = self.upsert_many(drafts).await?;

        for outcome in outcomes.iter_mut() {
            let Some(id) = outcome.rate_card_id.clone() else {
                continue;
            };
            match self.attach_source(&id, filename, bytes).await {
                Ok(_) => outcome.source_attached = true,
                Err(e) => {
                    tracing::warn!(rate_card_id = %id, error = %e, "Planilha de origem não anexada")
                }
            }
        }

        let created = outcomes.iter().filter(|o| o.created).count();
        tracing::info!(customers = outcomes.len(), created, file = filename, "Planilha importada");
        Ok(outcomes)
    }

    /// Guarda a planilha de origem no diretório da tabela, substituindo a anterior.
    pub async fn attach_source(
        &self,
        id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<RateCard, AppError> {
        self.get(id).await?;
        let stored_name = self.attachments.put(id, filename, bytes).await?;
        let stored = StoredFile {
            path: self.attachments.relative_path(id, &stored_name),
            name: stored_name.clone(),
        };

        let owned_id = id.to_string();
        let result = self
            .store
            .mutate::<RateCard, _, _>(move |cards| {
                let card = cards
                    .iter_mut()
                    .find(|c| c.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                let previous = card.source_file.replace(stored);
                card.updated_at = Utc::now();
                Ok((card.clone(), previous))
            })
            .await;

        match result {
            Ok((card, previous)) => {
                if let Some(old) = previous.filter(|old| old.name != stored_name) {
                    match self.attachments.delete(id, &old.name).await {
                        Ok(()) | Err(AppError::NotFound { .. }) => {}
                        Err(e) => {
                            tracing::warn!(id, file = %old.name, error = %e, "Planilha anterior não removida")
                        }
                    }
                }
                Ok(card)
            }
            Err(e) => {
                self.attachments.discard(id, std::slice::from_ref(&stored_name)).await;
                Err(e)
            }
        }
    }

    pub async fn read_source(&self, id: &str) -> Result<(StoredFile, Vec<u8>), AppError> {
        let card = self.get(id).await?;
        let source = card
            .source_file
            .ok_or_else(|| AppError::not_found("Planilha de origem", id))?;
        let bytes = self.attachments.get(id, &source.name).await?;
        Ok((source, bytes))
    }
}
