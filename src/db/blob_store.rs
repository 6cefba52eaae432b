// src/db/blob_store.rs

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::common::{
    error::AppError,
    fs_utils::{ensure_safe_segment, sanitize_filename},
};

/// Arquivo recebido num upload (nome original + conteúdo).
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Resultado individual de um upload em lote.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub original_name: String,
    pub stored_name: Option<String>,
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.stored_name.is_some()
    }
}

/// Armazenamento opaco de anexos, organizado por dono (id do documento).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Grava e devolve o nome efetivamente armazenado.
    async fn put(&self, owner_id: &str, filename: &str, bytes: &[u8]) -> Result<String, AppError>;

    async fn get(&self, owner_id: &str, stored_name: &str) -> Result<Vec<u8>, AppError>;

    /// `NotFound` se o arquivo não existe.
    async fn delete(&self, owner_id: &str, stored_name: &str) -> Result<(), AppError>;

    /// Remove o diretório inteiro do dono. Ausente não é erro.
    async fn delete_owner(&self, owner_id: &str) -> Result<(), AppError>;

    /// Caminho relativo gravado nos documentos (`<namespace>/<dono>/<nome>`).
    fn relative_path(&self, owner_id: &str, stored_name: &str) -> String;

    /// Remove só os arquivos listados (best-effort, com log). Os demais
    /// arquivos do dono não são tocados.
    async fn discard(&self, owner_id: &str, stored_names: &[String]) {
        for name in stored_names {
            match self.delete(owner_id, name).await {
                Ok(()) | Err(AppError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!(owner_id, file = %name, error = %e, "Falha ao descartar anexo");
                }
            }
        }
    }

    async fn put_many(&self, owner_id: &str, files: Vec<IncomingFile>) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let outcome = match self.put(owner_id, &file.name, &file.bytes).await {
                Ok(stored) => UploadOutcome {
                    original_name: file.name,
                    stored_name: Some(stored),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(owner_id, file = %file.name, error = %e, "Falha ao gravar anexo");
                    UploadOutcome {
                        original_name: file.name,
                        stored_name: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

// ---
// Implementação em disco
// ---
pub struct FsBlobStore {
    root: PathBuf,
    namespace: &'static str,
}

impl FsBlobStore {
    /// `base` é o diretório de uploads; os arquivos ficam em `base/namespace/<dono>/`.
    pub fn new(base: impl Into<PathBuf>, namespace: &'static str) -> Self {
        Self {
            root: base.into().join(namespace),
            namespace,
        }
    }

    fn owner_dir(&self, owner_id: &str) -> Result<PathBuf, AppError> {
        ensure_safe_segment(owner_id)?;
        Ok(self.root.join(owner_id))
    }
}

const MAX_NAME_ATTEMPTS: usize = 5;

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, owner_id: &str, filename: &str, bytes: &[u8]) -> Result<String, AppError> {
        let dir = self.owner_dir(owner_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let base = sanitize_filename(filename);
        let stamp = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = match attempt {
                0 => base.clone(),
                1 => format!("{}-{}", stamp, base),
                n => format!("{}-{}-{}", stamp, n, base),
            };
            let path = dir.join(&candidate);

            // create_new detecta a colisão de forma atômica
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }

            tracing::debug!(namespace = self.namespace, owner_id, stored = %candidate, "Anexo gravado");
            return Ok(candidate);
        }

        Err(AppError::Conflict(format!(
            "Não foi possível gerar um nome livre para '{}'",
            filename
        )))
    }

    async fn get(&self, owner_id: &str, stored_name: &str) -> Result<Vec<u8>, AppError> {
        ensure_safe_segment(stored_name)?;
        let path = self.owner_dir(owner_id)?.join(stored_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("Arquivo", stored_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, owner_id: &str, stored_name: &str) -> Result<(), AppError> {
        ensure_safe_segment(stored_name)?;
        let path = self.owner_dir(owner_id)?.join(stored_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("Arquivo", stored_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<(), AppError> {
        let dir = self.owner_dir(owner_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(namespace = self.namespace, owner_id, "Diretório de anexos removido");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn relative_path(&self, owner_id: &str, stored_name: &str) -> String {
        format!("{}/{}/{}", self.namespace, owner_id, stored_name)
    }
}
