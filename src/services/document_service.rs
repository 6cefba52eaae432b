// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Alignment, Element};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    common::{error::AppError, fs_utils::sanitize_filename},
    models::{note::Note, rate_card::RateCard},
};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Variante visual do documento exportado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTemplate {
    #[default]
    Standard,
    // Sem bloco de cabeçalho e com fonte menor (para impressão)
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

/// Transforma um documento já resolvido em binário. Não acessa o store.
pub trait DocumentRenderer: Send + Sync {
    fn render_note(&self, note: &Note, template: ExportTemplate) -> Result<RenderedDocument, AppError>;

    fn render_rate_card(
        &self,
        card: &RateCard,
        template: ExportTemplate,
    ) -> Result<RenderedDocument, AppError>;
}

// ---
// PDF (genpdf)
// ---
pub struct PdfRenderer {
    font_dir: PathBuf,
    font_family: String,
}

fn pdf_error(e: genpdf::error::Error) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn format_money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

impl PdfRenderer {
    /// `font_dir` precisa conter `<família>-Regular.ttf`, `-Bold`, `-Italic` e `-BoldItalic`.
    pub fn new(font_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self {
            font_dir: font_dir.into(),
            font_family: font_family.into(),
        }
    }

    fn document(&self, title: &str, template: ExportTemplate) -> Result<genpdf::Document, AppError> {
        let font_family = genpdf::fonts::from_files(&self.font_dir, &self.font_family, None)
            .map_err(|e| {
                tracing::error!(dir = %self.font_dir.display(), error = %e, "Fonte não encontrada");
                pdf_error(e)
            })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(title);
        if template == ExportTemplate::Compact {
            doc.set_font_size(9);
        }
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);
        Ok(doc)
    }

    fn finish(doc: genpdf::Document, filename: String) -> Result<RenderedDocument, AppError> {
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(RenderedDocument {
            bytes: buffer,
            filename,
            content_type: PDF_CONTENT_TYPE,
        })
    }
}

pub fn note_filename(note: &Note) -> String {
    let subject = sanitize_filename(&note.subject);
    format!("{}_{}.pdf", note.date.format("%Y-%m-%d"), subject.trim_matches('_'))
}

pub fn rate_card_filename(card: &RateCard) -> String {
    let customer = sanitize_filename(&card.customer_name);
    format!("{}_Fiyat_Listesi.pdf", customer.trim_matches('_'))
}

impl DocumentRenderer for PdfRenderer {
    fn render_note(&self, note: &Note, template: ExportTemplate) -> Result<RenderedDocument, AppError> {
        let mut doc = self.document(&note.subject, template)?;

        doc.push(
            elements::Paragraph::new(note.subject.clone())
                .styled(style::Style::new().bold().with_font_size(16)),
        );
        if template == ExportTemplate::Standard {
            doc.push(elements::Paragraph::new(format!("Müşteri: {}", note.customer_name)));
            doc.push(elements::Paragraph::new(format!(
                "Tarih: {}",
                note.date.format("%d.%m.%Y")
            )));
            doc.push(
                elements::Paragraph::new(format!("Hazırlayan: {}", note.created_by))
                    .styled(style::Style::new().italic().with_font_size(9)),
            );
        }
        doc.push(elements::Break::new(1.5));

        for line in note.content.lines() {
            if line.trim().is_empty() {
                doc.push(elements::Break::new(0.5));
            } else {
                doc.push(elements::Paragraph::new(line.to_string()));
            }
        }

        if !note.files.is_empty() {
            doc.push(elements::Break::new(1));
            doc.push(elements::Paragraph::new("Ekler").styled(style::Style::new().bold()));
            for file in &note.files {
                doc.push(elements::Paragraph::new(format!("- {}", file.name)));
            }
        }

        Self::finish(doc, note_filename(note))
    }

    fn render_rate_card(
        &self,
        card: &RateCard,
        template: ExportTemplate,
    ) -> Result<RenderedDocument, AppError> {
        let mut doc = self.document(&card.customer_name, template)?;

        doc.push(
            elements::Paragraph::new(format!("Fiyat Listesi: {}", card.customer_name))
                .styled(style::Style::new().bold().with_font_size(16)),
        );
        if template == ExportTemplate::Standard {
            let period = match (card.start_date, card.end_date) {
                (Some(s), Some(e)) => format!("{} - {}", s.format("%d.%m.%Y"), e.format("%d.%m.%Y")),
                (Some(s), None) => format!("{} -", s.format("%d.%m.%Y")),
                (None, Some(e)) => format!("- {}", e.format("%d.%m.%Y")),
                (None, None) => String::new(),
            };
            if !period.is_empty() {
                doc.push(elements::Paragraph::new(format!("Geçerlilik: {}", period)));
            }
        }
        doc.push(elements::Break::new(1.5));

        // Pesos das colunas: Serviço (5), Preço (2)
        let style_bold = style::Style::new().bold();
        for category in &card.categories {
            doc.push(elements::Paragraph::new(category.name.clone()).styled(style_bold));

            let mut table = elements::TableLayout::new(vec![5, 2]);
            table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
            for service in &category.services {
                let mut price = elements::Paragraph::new(format_money(service.price));
                price.set_alignment(Alignment::Right);
                table
                    .row()
                    .element(elements::Paragraph::new(service.name.clone()))
                    .element(price)
                    .push()
                    .map_err(pdf_error)?;
            }
            doc.push(table);
            doc.push(elements::Break::new(1));
        }

        Self::finish(doc, rate_card_filename(card))
    }
}
