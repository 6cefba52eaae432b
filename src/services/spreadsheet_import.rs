// src/services/spreadsheet_import.rs

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDate;
use rust_decimal::{prelude::FromPrimitive, Decimal};

use crate::{
    common::{error::AppError, fs_utils::fold},
    models::rate_card::{customer_key, NewRateCard, RateCategoryInput, RateServiceInput},
    services::spreadsheet_service::{
        coerce_price, FIRST_DATA_ROW, HEADERS, HEADER_ROW, ROW_CUSTOMER, ROW_END, ROW_START,
    },
};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

// Trechos procurados nos cabeçalhos do upload (comparados já "dobrados")
const CUSTOMER_KEYS: [&str; 1] = ["musteri"];
const CATEGORY_KEYS: [&str; 1] = ["kategori"];
const SERVICE_KEYS: [&str; 1] = ["hizmet"];
const PRICE_KEYS: [&str; 2] = ["fiyat", "birim"];
const START_KEYS: [&str; 1] = ["baslangic"];
const END_KEYS: [&str; 1] = ["bitis"];

fn first_sheet(bytes: &[u8]) -> Result<Range<Data>, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::validation("A planilha não tem nenhuma aba."))?
        .map_err(AppError::from)
}

fn last_row(range: &Range<Data>) -> Option<u32> {
    range.end().map(|(row, _)| row)
}

fn last_col(range: &Range<Data>) -> u32 {
    range.end().map(|(_, col)| col).unwrap_or(0)
}

// Texto de uma célula, já sem espaços nas pontas
fn text_at(range: &Range<Data>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Float(f)) => f.to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Bool(b)) => b.to_string(),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => s.trim().to_string(),
        Some(Data::DateTime(dt)) => dt
            .as_datetime()
            .map(|d| d.date().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn price_at(range: &Range<Data>, row: u32, col: u32) -> Result<Decimal, AppError> {
    let parsed = match range.get_value((row, col)) {
        Some(Data::Float(f)) => Decimal::from_f64(*f).map(|d| d.normalize()),
        Some(Data::Int(i)) => Some(Decimal::from(*i)),
        Some(Data::String(s)) => coerce_price(s),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AppError::validation(format!(
            "Linha {}: preço inválido '{}'",
            row + 1,
            text_at(range, row, col)
        ))
    })
}

fn date_at(range: &Range<Data>, row: u32, col: u32) -> Result<Option<NaiveDate>, AppError> {
    match range.get_value((row, col)) {
        None | Some(Data::Empty) => Ok(None),
        Some(Data::DateTime(dt)) => dt
            .as_datetime()
            .map(|d| Some(d.date()))
            .ok_or_else(|| AppError::validation(format!("Linha {}: data inválida", row + 1))),
        Some(_) => {
            let text = text_at(range, row, col);
            if text.is_empty() {
                return Ok(None);
            }
            // DateTimeIso pode trazer hora; a data vem antes do 'T'
            let date_part = text.split('T').next().unwrap_or(&text);
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
                .map(Some)
                .ok_or_else(|| {
                    AppError::validation(format!("Linha {}: data inválida '{}'", row + 1, text))
                })
        }
    }
}

// Agrupa serviços em categorias preservando a ordem de primeira aparição
#[derive(Default)]
struct CategoryGrouper {
    categories: Vec<RateCategoryInput>,
}

impl CategoryGrouper {
    fn push(&mut self, category: &str, service: String, price: Decimal) {
        let key = fold(category);
        let idx = match self.categories.iter().position(|c| fold(&c.name) == key) {
            Some(idx) => idx,
            None => {
                self.categories.push(RateCategoryInput {
                    id: None,
                    name: category.to_string(),
                    services: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        self.categories[idx].services.push(RateServiceInput {
            id: None,
            name: service,
            price,
        });
    }

    fn ensure(&mut self, category: &str) {
        let key = fold(category);
        if !self.categories.iter().any(|c| fold(&c.name) == key) {
            self.categories.push(RateCategoryInput {
                id: None,
                name: category.to_string(),
                services: Vec::new(),
            });
        }
    }
}

// ---
// Preview: cabeçalho fixo na linha 5
// ---

/// Lê uma planilha no layout de exportação e devolve o rascunho da tabela.
///
/// Os três cabeçalhos precisam existir na linha 5 com o texto exato; a
/// ausência de algum é erro de validação. Nada é gravado.
pub fn parse_preview(bytes: &[u8]) -> Result<NewRateCard, AppError> {
    let range = first_sheet(bytes)?;

    let header: Vec<String> = (0..=last_col(&range))
        .map(|col| text_at(&range, HEADER_ROW, col))
        .collect();
    let mut columns = [0u32; 3];
    let mut missing = Vec::new();
    for (slot, expected) in HEADERS.iter().enumerate() {
        match header.iter().position(|h| h == expected) {
            Some(col) => columns[slot] = col as u32,
            None => missing.push(*expected),
        }
    }
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "Colunas obrigatórias ausentes na linha {}: {}",
            HEADER_ROW + 1,
            missing.join(", ")
        )));
    }
    let [category_col, service_col, price_col] = columns;

    let customer_name = text_at(&range, ROW_CUSTOMER, 1);
    let start_date = date_at(&range, ROW_START, 1)?;
    let end_date = date_at(&range, ROW_END, 1)?;

    let mut grouper = CategoryGrouper::default();
    let mut current_category: Option<String> = None;

    if let Some(last) = last_row(&range) {
        for row in FIRST_DATA_ROW..=last {
            let category = text_at(&range, row, category_col);
            let service = text_at(&range, row, service_col);
            let price_text = text_at(&range, row, price_col);
            if category.is_empty() && service.is_empty() && price_text.is_empty() {
                continue;
            }

            if !category.is_empty() {
                current_category = Some(category);
            }
            let Some(category) = current_category.as_deref() else {
                return Err(AppError::validation(format!(
                    "Linha {}: serviço sem categoria",
                    row + 1
                )));
            };
            if service.is_empty() {
                return Err(AppError::validation(format!(
                    "Linha {}: nome do serviço vazio",
                    row + 1
                )));
            }
            let price = price_at(&range, row, price_col)?;
            grouper.push(category, service, price);
        }
    }

    Ok(NewRateCard {
        customer_name,
        start_date,
        end_date,
        categories: grouper.categories,
    })
}

// ---
// Upload: colunas localizadas pelo texto do cabeçalho
// ---

fn matches_any(folded: &str, keys: &[&str]) -> bool {
    keys.iter().any(|k| folded.contains(k))
}

struct UploadColumns {
    header_row: u32,
    customer: Option<u32>,
    category: u32,
    service: u32,
    price: u32,
}

fn locate_columns(range: &Range<Data>) -> Result<UploadColumns, AppError> {
    let last = last_row(range).ok_or_else(|| AppError::validation("A planilha está vazia."))?;

    for row in 0..=last {
        let folded: Vec<String> = (0..=last_col(range))
            .map(|col| fold(&text_at(range, row, col)))
            .collect();
        let find = |keys: &[&str]| {
            folded
                .iter()
                .position(|h| !h.is_empty() && matches_any(h, keys))
                .map(|c| c as u32)
        };

        let (Some(category), Some(service)) = (find(&CATEGORY_KEYS), find(&SERVICE_KEYS)) else {
            continue;
        };
        let price = find(&PRICE_KEYS).ok_or_else(|| {
            AppError::validation(format!("Linha {}: coluna de preço não encontrada", row + 1))
        })?;

        return Ok(UploadColumns {
            header_row: row,
            customer: find(&CUSTOMER_KEYS),
            category,
            service,
            price,
        });
    }

    Err(AppError::validation(
        "Cabeçalho não encontrado: a planilha precisa das colunas de categoria e serviço.",
    ))
}

// Valor à direita do primeiro rótulo que casa com `keys`, acima do cabeçalho
fn labelled_value(range: &Range<Data>, above: u32, keys: &[&str]) -> Option<(u32, u32)> {
    for row in 0..above {
        for col in 0..last_col(range) {
            if matches_any(&fold(&text_at(range, row, col)), keys) {
                return Some((row, col + 1));
            }
        }
    }
    None
}

/// Lê uma planilha enviada pelo usuário e devolve um rascunho por cliente.
///
/// Categoria em branco continua a anterior; cliente em branco pula a linha;
/// preço ilegível rejeita o arquivo inteiro. Sem coluna de cliente, vale o
/// rótulo "Müşteri" acima do cabeçalho.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<NewRateCard>, AppError> {
    let range = first_sheet(bytes)?;
    let columns = locate_columns(&range)?;

    let metadata_customer = labelled_value(&range, columns.header_row, &CUSTOMER_KEYS)
        .map(|(row, col)| text_at(&range, row, col))
        .filter(|name| !name.is_empty());
    let start_date = match labelled_value(&range, columns.header_row, &START_KEYS) {
        Some((row, col)) => date_at(&range, row, col)?,
        None => None,
    };
    let end_date = match labelled_value(&range, columns.header_row, &END_KEYS) {
        Some((row, col)) => date_at(&range, row, col)?,
        None => None,
    };

    // (nome exibido, agrupador) por cliente, na ordem em que aparecem
    let mut customers: Vec<(String, CategoryGrouper)> = Vec::new();
    let mut current_category: Option<String> = None;
    let last = last_row(&range).unwrap_or(columns.header_row);

    for row in (columns.header_row + 1)..=last {
        let customer = match columns.customer {
            Some(col) => {
                let name = text_at(&range, row, col);
                if name.is_empty() {
                    continue;
                }
                name
            }
            None => {
                let category = text_at(&range, row, columns.category);
                let service = text_at(&range, row, columns.service);
                if category.is_empty() && service.is_empty() {
                    continue;
                }
                metadata_customer.clone().ok_or_else(|| {
                    AppError::validation(
                        "Cliente não identificado: falta a coluna ou o rótulo 'Müşteri'.",
                    )
                })?
            }
        };

        let category = text_at(&range, row, columns.category);
        if !category.is_empty() {
            current_category = Some(category);
        }
        let Some(category) = current_category.clone() else {
            return Err(AppError::validation(format!(
                "Linha {}: serviço sem categoria",
                row + 1
            )));
        };

        let key = customer_key(&customer);
        let idx = match customers.iter().position(|(name, _)| customer_key(name) == key) {
            Some(idx) => idx,
            None => {
                customers.push((customer, CategoryGrouper::default()));
                customers.len() - 1
            }
        };
        let grouper = &mut customers[idx].1;

        let service = text_at(&range, row, columns.service);
        if service.is_empty() {
            // Linha só de categoria
            grouper.ensure(&category);
            continue;
        }
        let price = price_at(&range, row, columns.price)?;
        grouper.push(&category, service, price);
    }

    if customers.is_empty() {
        return Err(AppError::validation("Nenhuma linha de dados encontrada na planilha."));
    }

    Ok(customers
        .into_iter()
        .map(|(customer_name, grouper)| NewRateCard {
            customer_name,
            start_date,
            end_date,
            categories: grouper.categories,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::rate_card::{RateCard, RateCategory, RateService},
        services::spreadsheet_service::{export_rate_card, template},
    };
    use chrono::Utc;
    use rust_xlsxwriter::Workbook;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // Monta um xlsx a partir de linhas de texto (vazio = célula em branco)
    fn sheet(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn card(categories: Vec<RateCategory>) -> RateCard {
        RateCard {
            id: "rc1".into(),
            customer_name: "Acme".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            categories,
            source_file: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(name: &str, price: &str) -> RateService {
        RateService {
            id: name.into(),
            name: name.into(),
            price: dec(price),
        }
    }

    #[test]
    fn exportar_e_ler_no_preview_reconstroi_a_tabela() {
        let original = card(vec![
            RateCategory {
                id: "c1".into(),
                name: "Crew".into(),
                services: vec![service("Camera Operator", "5000"), service("Gaffer", "4250.75")],
            },
            RateCategory {
                id: "c2".into(),
                name: "Ekipman".into(),
                services: vec![service("Işık Seti", "1200.5")],
            },
        ]);

        let bytes = export_rate_card(&original).unwrap();
        let draft = parse_preview(&bytes).unwrap();

        assert_eq!(draft.customer_name, "Acme");
        assert_eq!(draft.start_date, original.start_date);
        assert_eq!(draft.end_date, original.end_date);
        assert_eq!(draft.categories.len(), 2);
        for (parsed, expected) in draft.categories.iter().zip(&original.categories) {
            assert_eq!(parsed.name, expected.name);
            let parsed: Vec<(&str, Decimal)> =
                parsed.services.iter().map(|s| (s.name.as_str(), s.price)).collect();
            let expected: Vec<(&str, Decimal)> =
                expected.services.iter().map(|s| (s.name.as_str(), s.price)).collect();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn preview_sem_coluna_obrigatoria_e_erro_de_validacao() {
        let bytes = sheet(&[
            &["Müşteri Adı", "Acme"],
            &[],
            &[],
            &[],
            &["Kategori", "Hizmet"],
            &["Crew", "Camera Operator", "5000"],
        ]);
        let err = parse_preview(&bytes).unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("Hizmet Adı"));
                assert!(msg.contains("Birim Fiyat"));
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn preview_rejeita_preco_ilegivel() {
        let bytes = sheet(&[
            &["Müşteri Adı", "Acme"],
            &[],
            &[],
            &[],
            &["Kategori", "Hizmet Adı", "Birim Fiyat"],
            &["Crew", "Camera Operator", "a combinar"],
        ]);
        let err = parse_preview(&bytes).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("Linha 6")));
    }

    #[test]
    fn upload_converte_preco_turco() {
        let bytes = sheet(&[
            &["Müşteri", "Kategori", "Hizmet", "Birim Fiyat"],
            &["Acme", "Crew", "Camera Operator", "1.250,00 ₺"],
        ]);
        let drafts = parse_upload(&bytes).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].categories[0].services[0].price, dec("1250.00"));
    }

    #[test]
    fn upload_agrupa_por_cliente_e_continua_categoria() {
        let bytes = sheet(&[
            &["Fiyat listesi 2025"],
            &["MÜŞTERİ ADI", "KATEGORİ", "HİZMET ADI", "FİYAT"],
            &["Acme", "Crew", "Camera Operator", "5000"],
            &["Acme", "", "Gaffer", "4000"],
            &["", "Crew", "Ignorada", "1"],
            &["Beta", "Ekipman", "Kamera", "750,50"],
            &["acme", "Ekipman", "Drone", "3000"],
        ]);
        let drafts = parse_upload(&bytes).unwrap();

        assert_eq!(drafts.len(), 2);
        let acme = &drafts[0];
        assert_eq!(acme.customer_name, "Acme");
        assert_eq!(acme.categories.len(), 2);
        let crew: Vec<&str> = acme.categories[0].services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(crew, ["Camera Operator", "Gaffer"]);
        assert_eq!(acme.categories[1].services[0].name, "Drone");

        assert_eq!(drafts[1].customer_name, "Beta");
        assert_eq!(drafts[1].categories[0].services[0].price, dec("750.5"));
    }

    #[test]
    fn upload_separa_clientes_que_diferem_so_no_acento() {
        let bytes = sheet(&[
            &["Müşteri", "Kategori", "Hizmet", "Fiyat"],
            &["Şen Yapım", "Crew", "Kameraman", "100"],
            &["Sen Yapım", "Crew", "Kameraman", "200"],
            &["ŞEN Yapım", "Crew", "Işık", "300"],
        ]);
        let drafts = parse_upload(&bytes).unwrap();

        let names: Vec<&str> = drafts.iter().map(|d| d.customer_name.as_str()).collect();
        assert_eq!(names, ["Şen Yapım", "Sen Yapım"]);
        assert_eq!(drafts[0].categories[0].services.len(), 2);
    }

    #[test]
    fn upload_rejeita_arquivo_com_preco_ilegivel() {
        let bytes = sheet(&[
            &["Müşteri", "Kategori", "Hizmet", "Fiyat"],
            &["Acme", "Crew", "Camera Operator", "5000"],
            &["Acme", "Crew", "Gaffer", "sor"],
        ]);
        let err = parse_upload(&bytes).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("Linha 3")));
    }

    #[test]
    fn modelo_e_exportacao_servem_de_upload() {
        let drafts = parse_upload(&template().unwrap()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].customer_name, "Örnek Müşteri");
        assert_eq!(drafts[0].categories[0].services.len(), 2);

        let exported = export_rate_card(&card(vec![RateCategory {
            id: "c1".into(),
            name: "Crew".into(),
            services: vec![service("Camera Operator", "5000")],
        }]))
        .unwrap();
        let drafts = parse_upload(&exported).unwrap();
        assert_eq!(drafts[0].customer_name, "Acme");
        assert_eq!(drafts[0].start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn arquivo_que_nao_e_planilha() {
        let err = parse_upload(b"isto nao e um xlsx").unwrap_err();
        assert!(matches!(err, AppError::SpreadsheetRead(_)));
    }
}
