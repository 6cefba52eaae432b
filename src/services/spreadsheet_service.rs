// src/services/spreadsheet_service.rs

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::{
    common::{error::AppError, fs_utils::sanitize_filename},
    models::rate_card::RateCard,
};

// ---
// Layout da planilha (exportação, modelo e preview usam o mesmo)
// ---
pub const SHEET_NAME: &str = "Fiyat Listesi";

pub const LABEL_CUSTOMER: &str = "Müşteri Adı";
pub const LABEL_START: &str = "Başlangıç";
pub const LABEL_END: &str = "Bitiş";

pub const HEADER_CATEGORY: &str = "Kategori";
pub const HEADER_SERVICE: &str = "Hizmet Adı";
pub const HEADER_PRICE: &str = "Birim Fiyat";
pub const HEADERS: [&str; 3] = [HEADER_CATEGORY, HEADER_SERVICE, HEADER_PRICE];

// Linhas 1-3 (índices 0-2): rótulo na coluna A, valor na B
pub const ROW_CUSTOMER: u32 = 0;
pub const ROW_START: u32 = 1;
pub const ROW_END: u32 = 2;
// Linha 5 (índice 4): cabeçalho; dados a partir da linha 6
pub const HEADER_ROW: u32 = 4;
pub const FIRST_DATA_ROW: u32 = 5;

const COLUMN_WIDTHS: [f64; 3] = [30.0, 40.0, 15.0];
const PRICE_FORMAT: &str = "#,##0.00";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub const TEMPLATE_FILENAME: &str = "Fiyat_Listesi_Sablonu.xlsx";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Uma linha achatada da planilha: a categoria se repete em cada serviço.
struct SheetRow<'a> {
    category: &'a str,
    service: &'a str,
    price: Decimal,
}

/// Nome sugerido para o download: `<cliente transliterado>_Fiyat_Listesi.xlsx`.
pub fn export_filename(customer_name: &str) -> String {
    let customer = sanitize_filename(customer_name);
    format!("{}_Fiyat_Listesi.xlsx", customer.trim_matches('_'))
}

/// Gera o xlsx de uma tabela de preços.
pub fn export_rate_card(card: &RateCard) -> Result<Vec<u8>, AppError> {
    let rows: Vec<SheetRow> = card
        .categories
        .iter()
        .flat_map(|category| {
            category.services.iter().map(move |service| SheetRow {
                category: &category.name,
                service: &service.name,
                price: service.price,
            })
        })
        .collect();

    let bytes = build_workbook(
        &card.customer_name,
        card.start_date,
        card.end_date,
        &rows,
    )?;
    tracing::debug!(rate_card_id = %card.id, rows = rows.len(), "Planilha exportada");
    Ok(bytes)
}

/// Modelo para upload: mesmo layout com linhas de exemplo. A segunda linha
/// deixa a categoria em branco para mostrar o agrupamento.
pub fn template() -> Result<Vec<u8>, AppError> {
    let rows = [
        SheetRow {
            category: "Çekim Ekibi",
            service: "Kameraman",
            price: Decimal::new(5000, 0),
        },
        SheetRow {
            category: "",
            service: "Işık Şefi",
            price: Decimal::new(4250, 0),
        },
        SheetRow {
            category: "Ekipman",
            service: "Kamera Seti (günlük)",
            price: Decimal::new(750050, 2),
        },
    ];
    build_workbook("Örnek Müşteri", None, None, &rows)
}

fn build_workbook(
    customer_name: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    rows: &[SheetRow],
) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    let bold = Format::new().set_bold();
    let price_format = Format::new().set_num_format(PRICE_FORMAT);

    write_metadata(worksheet, &bold, ROW_CUSTOMER, LABEL_CUSTOMER, customer_name)?;
    let start = start_date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default();
    write_metadata(worksheet, &bold, ROW_START, LABEL_START, &start)?;
    let end = end_date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default();
    write_metadata(worksheet, &bold, ROW_END, LABEL_END, &end)?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(HEADER_ROW, col as u16, *header, &bold)?;
    }

    for (offset, row) in rows.iter().enumerate() {
        let r = FIRST_DATA_ROW + offset as u32;
        if !row.category.is_empty() {
            worksheet.write_string(r, 0, row.category)?;
        }
        worksheet.write_string(r, 1, row.service)?;
        // Preço vai como número; o arredondamento fica só no formato de exibição
        let price = row
            .price
            .to_f64()
            .ok_or_else(|| anyhow::anyhow!("Preço fora do intervalo: {}", row.price))?;
        worksheet.write_number_with_format(r, 2, price, &price_format)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_metadata(
    worksheet: &mut Worksheet,
    bold: &Format,
    row: u32,
    label: &str,
    value: &str,
) -> Result<(), AppError> {
    worksheet.write_string_with_format(row, 0, label, bold)?;
    if !value.is_empty() {
        worksheet.write_string(row, 1, value)?;
    }
    Ok(())
}

// ---
// Coerção de preços digitados como texto
// ---

/// Converte um preço em texto ("1.250,00 ₺", "$ 5,000.50", "750") para decimal.
///
/// Ficam só dígitos, `.`, `,` e `-`. Com `.` e `,` presentes, o último é o
/// separador decimal. Uma `,` isolada seguida de 1 ou 2 dígitos é decimal,
/// caso contrário é milhar. Vários `.` sem `,` são milhar; um `.` só é decimal.
/// `None` quando o texto não representa um número.
pub fn coerce_price(raw: &str) -> Option<Decimal> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let (negative, body) = match kept.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, kept.as_str()),
    };
    if body.contains('-') || !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let dots = body.matches('.').count();
    let commas = body.matches(',').count();
    let decimal_sep = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let sep = if dot > comma { '.' } else { ',' };
            let count = if sep == '.' { dots } else { commas };
            if count > 1 {
                return None;
            }
            Some(sep)
        }
        (None, Some(comma)) => {
            let decimals = body.len() - comma - 1;
            (commas == 1 && (1..=2).contains(&decimals)).then_some(',')
        }
        (Some(_), None) => (dots == 1).then_some('.'),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(body.len() + 2);
    if negative {
        normalized.push('-');
    }
    for c in body.chars() {
        if c.is_ascii_digit() {
            normalized.push(c);
        } else if Some(c) == decimal_sep {
            if !normalized.ends_with(|d: char| d.is_ascii_digit()) {
                normalized.push('0');
            }
            normalized.push('.');
        }
    }
    if normalized.ends_with('.') {
        normalized.pop();
    }

    Decimal::from_str(&normalized).ok().map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use chrono::Utc;
    use std::io::Cursor;

    use crate::models::rate_card::{RateCategory, RateService};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn acme() -> RateCard {
        RateCard {
            id: "rc1".into(),
            customer_name: "Acme".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: None,
            categories: vec![RateCategory {
                id: "c1".into(),
                name: "Crew".into(),
                services: vec![RateService {
                    id: "s1".into(),
                    name: "Camera Operator".into(),
                    price: dec("5000"),
                }],
            }],
            source_file: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cell_text(cell: Option<&Data>) -> String {
        match cell {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Float(f)) => f.to_string(),
            Some(Data::Int(i)) => i.to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn precos_em_texto() {
        assert_eq!(coerce_price("1.250,00 ₺"), Some(dec("1250")));
        assert_eq!(coerce_price("$ 5,000.50"), Some(dec("5000.5")));
        assert_eq!(coerce_price("750"), Some(dec("750")));
        assert_eq!(coerce_price("12,5"), Some(dec("12.5")));
        assert_eq!(coerce_price("1,250"), Some(dec("1250")));
        assert_eq!(coerce_price("1.250.000"), Some(dec("1250000")));
        assert_eq!(coerce_price("99.90"), Some(dec("99.9")));
        assert_eq!(coerce_price("-15,00 TL"), Some(dec("-15")));
        assert_eq!(coerce_price(",5"), Some(dec("0.5")));
    }

    #[test]
    fn precos_invalidos() {
        assert_eq!(coerce_price(""), None);
        assert_eq!(coerce_price("ücretsiz"), None);
        assert_eq!(coerce_price("₺"), None);
        assert_eq!(coerce_price("10-20"), None);
        assert_eq!(coerce_price("1.2.3,4.5"), None);
    }

    #[test]
    fn nome_do_arquivo_exportado_e_ascii() {
        assert_eq!(export_filename("Acme"), "Acme_Fiyat_Listesi.xlsx");
        assert_eq!(
            export_filename("Şişli Prodüksiyon"),
            "Sisli_Produksiyon_Fiyat_Listesi.xlsx"
        );
    }

    #[test]
    fn exportacao_segue_o_layout() {
        let bytes = export_rate_card(&acme()).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();

        assert_eq!(cell_text(range.get_value((0, 0))), LABEL_CUSTOMER);
        assert_eq!(cell_text(range.get_value((0, 1))), "Acme");
        assert_eq!(cell_text(range.get_value((1, 1))), "2025-01-01");
        assert_eq!(cell_text(range.get_value((2, 0))), LABEL_END);

        let header: Vec<String> = (0..3).map(|c| cell_text(range.get_value((4, c)))).collect();
        assert_eq!(header, ["Kategori", "Hizmet Adı", "Birim Fiyat"]);

        let first: Vec<String> = (0..3).map(|c| cell_text(range.get_value((5, c)))).collect();
        assert_eq!(first, ["Crew", "Camera Operator", "5000"]);
    }

    #[test]
    fn modelo_abre_e_tem_cabecalho() {
        let bytes = template().unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();

        assert_eq!(cell_text(range.get_value((4, 1))), HEADER_SERVICE);
        assert_eq!(cell_text(range.get_value((6, 0))), "");
        assert_eq!(cell_text(range.get_value((6, 1))), "Işık Şefi");
    }
}
