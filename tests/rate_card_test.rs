use std::str::FromStr;

use backoffice::{
    config::{AppState, Config},
    models::rate_card::{NewRateCard, RateCardUpdate},
    services::{spreadsheet_import, spreadsheet_service},
    AppError,
};
use rust_decimal::Decimal;
use serde_json::json;
use tempfile::TempDir;

fn state(tmp: &TempDir) -> AppState {
    AppState::from_config(Config::for_data_dir(tmp.path(), "segredo-de-teste")).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn acme() -> NewRateCard {
    serde_json::from_value(json!({
        "customerName": "Acme",
        "startDate": "2025-01-01",
        "endDate": "2025-12-31",
        "categories": [
            { "name": "Crew", "services": [
                { "name": "Camera Operator", "price": "5000" },
                { "name": "Gaffer", "price": "4250.75" }
            ]},
            { "name": "Ekipman", "services": [
                { "name": "Işık Seti", "price": "1200.50" }
            ]},
            { "name": "Post", "services": [] }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn cliente_e_unico_sem_diferenciar_caixa() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    state.rate_card_repo.create(acme()).await.unwrap();

    let mut dup = acme();
    dup.customer_name = "  ACME ".into();
    let err = state.rate_card_repo.create(dup).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn exportar_e_pre_visualizar_reconstroi_os_servicos() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let card = state.rate_card_repo.create(acme()).await.unwrap();

    let bytes = spreadsheet_service::export_rate_card(&card).unwrap();
    let draft = spreadsheet_import::parse_preview(&bytes).unwrap();

    assert_eq!(draft.customer_name, card.customer_name);
    // Categoria sem serviços não gera linha na planilha
    let with_services: Vec<_> = card.categories.iter().filter(|c| !c.services.is_empty()).collect();
    assert_eq!(draft.categories.len(), with_services.len());
    for (parsed, original) in draft.categories.iter().zip(with_services) {
        assert_eq!(parsed.name, original.name);
        assert_eq!(parsed.services.len(), original.services.len());
        for (p, o) in parsed.services.iter().zip(&original.services) {
            assert_eq!(p.name, o.name);
            assert!((p.price - o.price).abs() < dec("0.005"));
        }
    }
}

#[tokio::test]
async fn upload_substitui_cliente_existente_e_guarda_a_origem() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let card = state.rate_card_repo.create(acme()).await.unwrap();

    // Exporta, muda o preço no payload e reimporta como upload
    let mut changed = card.clone();
    changed.categories[0].services[0].price = dec("5500");
    let bytes = spreadsheet_service::export_rate_card(&changed).unwrap();

    let outcomes = state
        .rate_card_repo
        .import_upload(&bytes, "Acme_Fiyat_Listesi.xlsx")
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].rate_card_id.as_deref(), Some(card.id.as_str()));
    assert!(!outcomes[0].created);
    assert!(outcomes[0].source_attached);

    let reloaded = state.rate_card_repo.get(&card.id).await.unwrap();
    assert_eq!(reloaded.categories[0].services[0].price, dec("5500"));
    assert_eq!(state.rate_card_repo.list().await.unwrap().len(), 1);

    let (source, stored) = state.rate_card_repo.read_source(&card.id).await.unwrap();
    assert_eq!(stored, bytes);
    assert_eq!(source.path, format!("ratecards/{}/{}", card.id, source.name));
}

#[tokio::test]
async fn upload_cria_tabela_para_cliente_novo() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);

    let bytes = spreadsheet_service::template().unwrap();
    let outcomes = state
        .rate_card_repo
        .import_upload(&bytes, "sablon.xlsx")
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].created);
    let found = state
        .rate_card_repo
        .find_by_customer("örnek müşteri")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.service_count(), 3);
    assert!(found.source_file.is_some());
}

#[tokio::test]
async fn periodo_invertido_e_recusado_e_exclusao_remove_arquivos() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let card = state.rate_card_repo.create(acme()).await.unwrap();

    let patch: RateCardUpdate =
        serde_json::from_value(json!({ "endDate": "2024-01-01" })).unwrap();
    let err = state.rate_card_repo.update(&card.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let bytes = spreadsheet_service::export_rate_card(&card).unwrap();
    state
        .rate_card_repo
        .attach_source(&card.id, "a.xlsx", &bytes)
        .await
        .unwrap();
    let report = state.rate_card_repo.delete(&card.id).await.unwrap();
    assert!(report.attachments_removed);
    assert!(!tmp.path().join("uploads/ratecards").join(&card.id).exists());
    assert!(matches!(
        state.rate_card_repo.get(&card.id).await.unwrap_err(),
        AppError::NotFound { .. }
    ));
}

#[tokio::test]
async fn cliente_e_unico_na_atualizacao_mas_acentos_distinguem() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let acme_card = state.rate_card_repo.create(acme()).await.unwrap();

    let mut sen = acme();
    sen.customer_name = "Sen Yapım".into();
    let sen_card = state.rate_card_repo.create(sen).await.unwrap();
    // "Şen" não é "Sen": só a caixa é ignorada
    let mut sen_accented = acme();
    sen_accented.customer_name = "Şen Yapım".into();
    state.rate_card_repo.create(sen_accented).await.unwrap();

    let steal: RateCardUpdate =
        serde_json::from_value(json!({ "customerName": "acme" })).unwrap();
    let err = state.rate_card_repo.update(&sen_card.id, steal).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let same: RateCardUpdate =
        serde_json::from_value(json!({ "customerName": "ACME", "endDate": null })).unwrap();
    let updated = state.rate_card_repo.update(&acme_card.id, same).await.unwrap();
    assert_eq!(updated.customer_name, "ACME");
    assert_eq!(updated.end_date, None);
    assert_eq!(state.rate_card_repo.list().await.unwrap().len(), 3);
}
