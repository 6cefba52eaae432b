pub mod blob_store;
pub mod collection_store;
pub mod integrity;

pub mod assignment_repo;
pub use assignment_repo::AssignmentRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod note_repo;
pub use note_repo::NoteRepository;
pub mod proposal_repo;
pub use proposal_repo::ProposalRepository;
pub mod rate_card_repo;
pub use rate_card_repo::RateCardRepository;
pub mod reset_token_repo;
pub use reset_token_repo::ResetTokenRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

pub use blob_store::{BlobStore, FsBlobStore, IncomingFile, UploadOutcome};
pub use collection_store::{CollectionStore, Document};

use serde::Serialize;

/// Resumo de uma exclusão com recursos dependentes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub id: String,
    // Documentos dependentes removidos junto (cascata)
    pub removed_dependents: usize,
    // false se o diretório de anexos não pôde ser removido (ver logs)
    pub attachments_removed: bool,
}
