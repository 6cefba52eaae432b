// src/models/note.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{attachment::StoredFile, validate_not_blank};
use crate::db::collection_store::Document;

/// Nota de reunião/cliente. `files` só contém anexos que existem no
/// diretório da nota.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub customer_name: String,
    pub subject: String,
    pub content: String,
    pub date: NaiveDate,
    pub created_by: String,
    #[serde(default)]
    pub files: Vec<StoredFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Note {
    const COLLECTION: &'static str = "notes";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub subject: String,

    #[serde(default)]
    pub content: String,

    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_name: Option<String>,

    #[validate(custom(function = "validate_not_blank"))]
    pub subject: Option<String>,

    pub content: Option<String>,

    pub date: Option<NaiveDate>,
}

impl NoteUpdate {
    pub fn apply_to(self, note: &mut Note) {
        if let Some(v) = self.customer_name {
            note.customer_name = v.trim().to_string();
        }
        if let Some(v) = self.subject {
            note.subject = v.trim().to_string();
        }
        if let Some(v) = self.content {
            note.content = v;
        }
        if let Some(v) = self.date {
            note.date = v;
        }
    }
}
