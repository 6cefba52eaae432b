// src/models/attachment.rs

use serde::{Deserialize, Serialize};

/// Referência a um anexo gravado no diretório do documento dono.
/// `name` é o nome armazenado, `path` o caminho relativo ao diretório de uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub path: String,
}
