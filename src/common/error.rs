// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Código estável (legível por máquina) de cada erro.
/// O frontend e os testes dependem destes valores, não das mensagens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Conflict,
    DanglingReference,
    ReferencedEntity,
    InvalidToken,
    ExpiredToken,
    InvalidCredentials,
    Forbidden,
    StorageCorruption,
    StoreBusy,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::DanglingReference => "DANGLING_REFERENCE",
            ErrorKind::ReferencedEntity => "REFERENCED_ENTITY",
            ErrorKind::InvalidToken => "INVALID_TOKEN",
            ErrorKind::ExpiredToken => "EXPIRED_TOKEN",
            ErrorKind::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::StorageCorruption => "STORAGE_CORRUPTION",
            ErrorKind::StoreBusy => "STORE_BUSY",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validações manuais (planilhas, regras de negócio) que não vêm do `validator`
    #[error("{0}")]
    Validation(String),

    #[error("{entity} não encontrado: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Referência inexistente: {0}")]
    DanglingReference(String),

    #[error("{entity} {id} ainda é referenciado por {dependents} registro(s)")]
    ReferencedEntity {
        entity: &'static str,
        id: String,
        dependents: usize,
    },

    #[error("Token inválido")]
    InvalidToken,

    #[error("Token expirado")]
    ExpiredToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Coleção '{collection}' ilegível: {detail}")]
    StorageCorruption { collection: String, detail: String },

    #[error("Coleção '{0}' ocupada, tente novamente")]
    StoreBusy(String),

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Planilha ilegível: {0}")]
    SpreadsheetRead(#[from] calamine::Error),

    #[error("Falha ao gerar planilha: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound { entity, id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => ErrorKind::ValidationError,
            // Uma planilha que não abre é culpa do arquivo enviado, não do servidor
            AppError::SpreadsheetRead(_) => ErrorKind::ValidationError,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::DanglingReference(_) => ErrorKind::DanglingReference,
            AppError::ReferencedEntity { .. } => ErrorKind::ReferencedEntity,
            AppError::InvalidToken | AppError::JwtError(_) => ErrorKind::InvalidToken,
            AppError::ExpiredToken => ErrorKind::ExpiredToken,
            AppError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::StorageCorruption { .. } => ErrorKind::StorageCorruption,
            AppError::StoreBusy(_) => ErrorKind::StoreBusy,
            AppError::Io(_)
            | AppError::SpreadsheetWrite(_)
            | AppError::BcryptError(_)
            | AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::ReferencedEntity => StatusCode::CONFLICT,
            ErrorKind::DanglingReference => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InvalidToken
            | ErrorKind::ExpiredToken
            | ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::StoreBusy => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::StorageCorruption | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": kind.as_str(),
                    "message": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            // Erros internos: o `tracing` registra o detalhe, o cliente recebe só o código.
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({
                    "error": kind.as_str(),
                    "message": "Ocorreu um erro inesperado.",
                })
            }
            e => json!({
                "error": kind.as_str(),
                "message": e.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
