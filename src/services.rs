pub mod auth;
pub mod document_service;
pub mod spreadsheet_import;
pub mod spreadsheet_service;
