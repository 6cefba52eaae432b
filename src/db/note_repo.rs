// src/db/note_repo.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{BlobStore, CollectionStore, DeleteReport, IncomingFile, UploadOutcome},
    models::{
        attachment::StoredFile,
        new_id,
        note::{NewNote, Note, NoteUpdate},
    },
};

const ENTITY: &str = "Nota";

#[derive(Clone)]
pub struct NoteRepository {
    store: Arc<CollectionStore>,
    files: Arc<dyn BlobStore>,
}

impl NoteRepository {
    pub fn new(store: Arc<CollectionStore>, files: Arc<dyn BlobStore>) -> Self {
        Self { store, files }
    }

    /// Mais recentes primeiro.
    pub async fn list(&self) -> Result<Vec<Note>, AppError> {
        let mut notes = self.store.load::<Note>().await?;
        notes.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(notes)
    }

    pub async fn get(&self, id: &str) -> Result<Note, AppError> {
        self.store
            .find::<Note>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    pub async fn create(&self, payload: NewNote, created_by: &str) -> Result<Note, AppError> {
        payload.validate()?;
        let created_by = created_by.to_string();

        self.store
            .mutate::<Note, _, _>(move |notes| {
                let now = Utc::now();
                let note = Note {
                    id: new_id(),
                    customer_name: payload.customer_name.trim().to_string(),
                    subject: payload.subject.trim().to_string(),
                    content: payload.content,
                    date: payload.date,
                    created_by,
                    files: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                notes.push(note.clone());
                Ok(note)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: NoteUpdate) -> Result<Note, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<Note, _, _>(move |notes| {
                let note = notes
                    .iter_mut()
                    .find(|n| n.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                patch.apply_to(note);
                note.updated_at = Utc::now();
                Ok(note.clone())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteReport, AppError> {
        let owned_id = id.to_string();

        self.store
            .mutate::<Note, _, _>(move |notes| {
                let idx = notes
                    .iter()
                    .position(|n| n.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                notes.remove(idx);
                Ok(())
            })
            .await?;

        let attachments_removed = match self.files.delete_owner(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id, error = %e, "Anexos da nota não puderam ser removidos");
                false
            }
        };

        Ok(DeleteReport {
            id: id.to_string(),
            removed_dependents: 0,
            attachments_removed,
        })
    }

    // ---
    // Anexos
    // ---

    pub async fn attach_files(
        &self,
        id: &str,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<UploadOutcome>, AppError> {
        self.get(id).await?;

        let outcomes = self.files.put_many(id, files).await;
        let stored: Vec<StoredFile> = outcomes
            .iter()
            .filter_map(|o| o.stored_name.as_ref())
            .map(|name| StoredFile {
                name: name.clone(),
                path: self.files.relative_path(id, name),
            })
            .collect();

        if stored.is_empty() {
            return Ok(outcomes);
        }
        let stored_names: Vec<String> = stored.iter().map(|f| f.name.clone()).collect();

        let owned_id = id.to_string();
        let registered = self
            .store
            .mutate::<Note, _, _>(move |notes| {
                let note = notes
                    .iter_mut()
                    .find(|n| n.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                note.files.extend(stored);
                note.updated_at = Utc::now();
                Ok(())
            })
            .await;

        if let Err(e) = registered {
            // Só os arquivos deste upload; os já registrados continuam válidos
            self.files.discard(id, &stored_names).await;
            return Err(e);
        }
        Ok(outcomes)
    }

    /// Idempotente: remover um anexo que já não existe devolve a nota como está.
    pub async fn remove_file(&self, id: &str, stored_name: &str) -> Result<Note, AppError> {
        let owned_id = id.to_string();
        let name = stored_name.to_string();

        let note = self
            .store
            .mutate::<Note, _, _>(move |notes| {
                let note = notes
                    .iter_mut()
                    .find(|n| n.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                let before = note.files.len();
                note.files.retain(|f| f.name != name);
                if note.files.len() != before {
                    note.updated_at = Utc::now();
                }
                Ok(note.clone())
            })
            .await?;

        match self.files.delete(id, stored_name).await {
            Ok(()) | Err(AppError::NotFound { .. }) => Ok(note),
            Err(e) => Err(e),
        }
    }

    pub async fn read_file(&self, id: &str, stored_name: &str) -> Result<Vec<u8>, AppError> {
        let note = self.get(id).await?;
        if !note.files.iter().any(|f| f.name == stored_name) {
            return Err(AppError::not_found("Anexo", stored_name));
        }
        self.files.get(id, stored_name).await
    }
}
