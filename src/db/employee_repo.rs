// src/db/employee_repo.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{
        integrity::{self, DeletePolicy},
        BlobStore, CollectionStore, DeleteReport, Document, IncomingFile, UploadOutcome,
    },
    models::{
        assignment::Assignment,
        attachment::StoredFile,
        employee::{Employee, EmployeeUpdate, NewEmployee},
        new_id,
    },
};

const ENTITY: &str = "Funcionário";

// Locks usados na exclusão, conforme a política
const BLOCK_WRITES: &[&str] = &[Employee::COLLECTION];
const BLOCK_READS: &[&str] = &[Assignment::COLLECTION];
const CASCADE_WRITES: &[&str] = &[Employee::COLLECTION, Assignment::COLLECTION];
const NO_READS: &[&str] = &[];

// O repositório de funcionários + os documentos pessoais de cada um
#[derive(Clone)]
pub struct EmployeeRepository {
    store: Arc<CollectionStore>,
    documents: Arc<dyn BlobStore>,
}

fn ensure_unique_national_id(
    employees: &[Employee],
    national_id: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    let taken = employees
        .iter()
        .any(|e| e.national_id == national_id && Some(e.id.as_str()) != except_id);
    if taken {
        return Err(AppError::Conflict(format!(
            "Já existe um funcionário com o documento {}",
            national_id
        )));
    }
    Ok(())
}

impl EmployeeRepository {
    pub fn new(store: Arc<CollectionStore>, documents: Arc<dyn BlobStore>) -> Self {
        Self { store, documents }
    }

    // Ordenado por id (não há ordem de negócio para funcionários)
    pub async fn list(&self) -> Result<Vec<Employee>, AppError> {
        let mut employees = self.store.load::<Employee>().await?;
        employees.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(employees)
    }

    pub async fn get(&self, id: &str) -> Result<Employee, AppError> {
        self.store
            .find::<Employee>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    /// Verificação de unicidade e inclusão acontecem na mesma mutação.
    pub async fn create(&self, payload: NewEmployee) -> Result<Employee, AppError> {
        payload.validate()?;

        self.store
            .mutate::<Employee, _, _>(move |employees| {
                let national_id = payload.national_id.trim().to_string();
                ensure_unique_national_id(employees, &national_id, None)?;

                let now = Utc::now();
                let employee = Employee {
                    id: new_id(),
                    full_name: payload.full_name.trim().to_string(),
                    national_id,
                    birth_date: payload.birth_date,
                    social_security_no: payload.social_security_no,
                    start_date: payload.start_date,
                    end_date: payload.end_date,
                    is_active: payload.is_active,
                    phone: payload.phone,
                    documents: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                employees.push(employee.clone());
                tracing::info!(id = %employee.id, "Funcionário criado");
                Ok(employee)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: EmployeeUpdate) -> Result<Employee, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<Employee, _, _>(move |employees| {
                let idx = employees
                    .iter()
                    .position(|e| e.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                let mut updated = employees[idx].clone();
                patch
                    .apply_to(&mut updated)
                    .map_err(|e| AppError::validation(e.to_string()))?;
                ensure_unique_national_id(employees, &updated.national_id, Some(&id))?;

                updated.updated_at = Utc::now();
                employees[idx] = updated.clone();
                Ok(updated)
            })
            .await
    }

    /// Exclui o funcionário conforme a política escolhida e depois remove
    /// o diretório de documentos dele (best-effort, com log).
    ///
    /// A coleção de zimmets fica travada junto: leitura para `Block`,
    /// escrita para `Cascade`.
    pub async fn delete(&self, id: &str, policy: DeletePolicy) -> Result<DeleteReport, AppError> {
        let owned_id = id.to_string();
        let (writes, reads) = match policy {
            DeletePolicy::Block => (BLOCK_WRITES, BLOCK_READS),
            DeletePolicy::Cascade => (CASCADE_WRITES, NO_READS),
        };

        let removed_dependents = self
            .store
            .transact(writes, reads, move |tx| {
                let mut employees = tx.load::<Employee>()?;
                let idx = employees
                    .iter()
                    .position(|e| e.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;

                let mut assignments = tx.load::<Assignment>()?;
                let dependents = integrity::assignments_of_employee(&assignments, &owned_id);

                if dependents > 0 {
                    match policy {
                        DeletePolicy::Block => {
                            return Err(AppError::ReferencedEntity {
                                entity: ENTITY,
                                id: owned_id,
                                dependents,
                            });
                        }
                        DeletePolicy::Cascade => {
                            assignments.retain(|a| a.employee_id != owned_id);
                            // Zimmets primeiro: se a segunda gravação falhar,
                            // sobra um funcionário sem zimmets, nunca o contrário.
                            tx.stage(&assignments)?;
                        }
                    }
                }

                employees.remove(idx);
                tx.stage(&employees)?;
                Ok(dependents)
            })
            .await?;

        let attachments_removed = match self.documents.delete_owner(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id, error = %e, "Documentos do funcionário não puderam ser removidos");
                false
            }
        };

        tracing::info!(id, removed_dependents, "Funcionário excluído");
        Ok(DeleteReport {
            id: id.to_string(),
            removed_dependents,
            attachments_removed,
        })
    }

    // ---
    // Documentos pessoais (anexos)
    // ---

    /// Grava os arquivos e registra no funcionário só os que foram gravados.
    pub async fn attach_documents(
        &self,
        id: &str,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<UploadOutcome>, AppError> {
        self.get(id).await?;

        let outcomes = self.documents.put_many(id, files).await;
        let stored: Vec<StoredFile> = outcomes
            .iter()
            .filter_map(|o| o.stored_name.as_ref())
            .map(|name| StoredFile {
                name: name.clone(),
                path: self.documents.relative_path(id, name),
            })
            .collect();

        if stored.is_empty() {
            return Ok(outcomes);
        }
        let stored_names: Vec<String> = stored.iter().map(|f| f.name.clone()).collect();

        let owned_id = id.to_string();
        let registered = self
            .store
            .mutate::<Employee, _, _>(move |employees| {
                let employee = employees
                    .iter_mut()
                    .find(|e| e.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                employee.documents.extend(stored);
                employee.updated_at = Utc::now();
                Ok(())
            })
            .await;

        if let Err(e) = registered {
            // Só os arquivos deste upload; os já registrados continuam válidos
            self.documents.discard(id, &stored_names).await;
            return Err(e);
        }
        Ok(outcomes)
    }

    /// Remove um documento. Remover de novo um documento já removido não é erro.
    pub async fn remove_document(&self, id: &str, stored_name: &str) -> Result<Employee, AppError> {
        let owned_id = id.to_string();
        let name = stored_name.to_string();

        let employee = self
            .store
            .mutate::<Employee, _, _>(move |employees| {
                let employee = employees
                    .iter_mut()
                    .find(|e| e.id == owned_id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &owned_id))?;
                let before = employee.documents.len();
                employee.documents.retain(|d| d.name != name);
                if employee.documents.len() != before {
                    employee.updated_at = Utc::now();
                }
                Ok(employee.clone())
            })
            .await?;

        match self.documents.delete(id, stored_name).await {
            Ok(()) | Err(AppError::NotFound { .. }) => Ok(employee),
            Err(e) => Err(e),
        }
    }

    pub async fn read_document(&self, id: &str, stored_name: &str) -> Result<Vec<u8>, AppError> {
        let employee = self.get(id).await?;
        if !employee.documents.iter().any(|d| d.name == stored_name) {
            return Err(AppError::not_found("Documento", stored_name));
        }
        self.documents.get(id, stored_name).await
    }
}
