pub mod assignments;
pub mod auth;
pub mod documents;
pub mod employees;
pub mod inventory;
pub mod notes;
pub mod proposals;
pub mod rate_cards;
pub mod users;

use axum::{
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{common::error::AppError, db::IncomingFile};

// Lê todos os arquivos de um multipart (campos sem nome de arquivo são ignorados)
pub(crate) async fn read_files(mut multipart: Multipart) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Upload inválido: {}", e)))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Upload inválido: {}", e)))?;
        files.push(IncomingFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

pub(crate) async fn read_single_file(multipart: Multipart) -> Result<IncomingFile, AppError> {
    read_files(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation("Nenhum arquivo enviado."))
}

// Configura os headers para o navegador baixar o arquivo
pub(crate) fn attachment(bytes: Vec<u8>, filename: &str, content_type: &str) -> Response {
    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    (headers, bytes).into_response()
}
