use std::str::FromStr;

use backoffice::{
    config::{AppState, Config},
    models::{
        assignment::NewAssignment,
        auth::{NewUserRecord, Role, UserUpdate},
        employee::{EmployeeUpdate, NewEmployee},
        inventory::{InventoryItemUpdate, NewInventoryItem},
        proposal::{NewProposal, ProposalStatus, ProposalUpdate},
    },
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

fn employee(national_id: &str) -> NewEmployee {
    serde_json::from_value(json!({
        "fullName": "Mehmet Yılmaz",
        "nationalId": national_id,
        "birthDate": "1990-05-17",
        "startDate": "2024-01-02"
    }))
    .unwrap()
}

fn user(email: &str) -> NewUserRecord {
    NewUserRecord {
        email: email.into(),
        name: "Zeynep".into(),
        password_hash: "$2b$10$hash".into(),
        role: Role::User,
    }
}

fn proposal(date: &str, discount: Option<&str>) -> NewProposal {
    serde_json::from_value(json!({
        "customerName": "Acme",
        "projectName": format!("Reklam {date}"),
        "date": date,
        "discount": discount,
        "topics": [{
            "title": "Çekim",
            "services": [
                { "name": "Kameraman", "qty": "2", "unit": "gün", "unitPrice": "1500" },
                { "name": "Işık", "qty": "1", "unit": "gün", "unitPrice": "1000" }
            ]
        }]
    }))
    .unwrap()
}

// ---
// Unicidade na atualização
// ---

#[tokio::test]
async fn documento_do_funcionario_e_unico_na_atualizacao() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let first = state.employee_repo.create(employee("111")).await.unwrap();
    let second = state.employee_repo.create(employee("222")).await.unwrap();

    let steal = EmployeeUpdate {
        national_id: Some("111".into()),
        ..Default::default()
    };
    let err = state.employee_repo.update(&second.id, steal).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Regravar o próprio valor não conflita consigo mesmo
    let same = EmployeeUpdate {
        national_id: Some("111".into()),
        phone: Some("555".into()),
        ..Default::default()
    };
    let updated = state.employee_repo.update(&first.id, same).await.unwrap();
    assert_eq!(updated.national_id, "111");
    assert_eq!(updated.phone, "555");
    assert_eq!(state.employee_repo.get(&second.id).await.unwrap().national_id, "222");
}

#[tokio::test]
async fn email_do_usuario_e_unico_na_atualizacao() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let ali = state.user_repo.create(user("ali@example.com")).await.unwrap();
    let veli = state.user_repo.create(user("veli@example.com")).await.unwrap();

    let steal = UserUpdate {
        email: Some("ALI@example.com".into()),
        ..Default::default()
    };
    let err = state.user_repo.update(&veli.id, steal).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let same = UserUpdate {
        email: Some("Ali@Example.com".into()),
        role: Some(Role::Admin),
        ..Default::default()
    };
    let updated = state.user_repo.update(&ali.id, same).await.unwrap();
    assert_eq!(updated.email, "ali@example.com");
    assert_eq!(updated.role, Role::Admin);
}

// ---
// Propostas
// ---

#[tokio::test]
async fn propostas_listadas_da_mais_recente_para_a_mais_antiga() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    for date in ["2025-01-10", "2025-03-01", "2024-12-31"] {
        state.proposal_repo.create(proposal(date, None)).await.unwrap();
    }

    let dates: Vec<String> = state
        .proposal_repo
        .list()
        .await
        .unwrap()
        .iter()
        .map(|p| p.date.to_string())
        .collect();
    assert_eq!(dates, ["2025-03-01", "2025-01-10", "2024-12-31"]);
}

#[tokio::test]
async fn total_da_proposta_e_recalculado_em_cada_gravacao() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let created = state
        .proposal_repo
        .create(proposal("2025-01-10", Some("500")))
        .await
        .unwrap();
    // 2 * 1500 + 1 * 1000 - 500
    assert_eq!(created.total_amount, dec("3500"));

    let patch: ProposalUpdate = serde_json::from_value(json!({
        "topics": [{
            "title": "Çekim",
            "services": [{ "name": "Kameraman", "qty": "3", "unit": "gün", "unitPrice": "1500" }]
        }]
    }))
    .unwrap();
    let updated = state.proposal_repo.update(&created.id, patch).await.unwrap();
    assert_eq!(updated.topics[0].services[0].total, dec("4500"));
    assert_eq!(updated.total_amount, dec("4000"));

    let sent = state
        .proposal_repo
        .set_status(&created.id, ProposalStatus::Sent)
        .await
        .unwrap();
    assert_eq!(sent.status, ProposalStatus::Sent);
    assert_eq!(sent.total_amount, dec("4000"));
    assert_eq!(state.proposal_repo.get(&created.id).await.unwrap().total_amount, dec("4000"));
}

#[tokio::test]
async fn desconto_maior_que_o_subtotal_e_recusado() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);

    let err = state
        .proposal_repo
        .create(proposal("2025-01-10", Some("5000")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(state.proposal_repo.list().await.unwrap().is_empty());

    let created = state
        .proposal_repo
        .create(proposal("2025-01-10", Some("100")))
        .await
        .unwrap();
    let patch: ProposalUpdate = serde_json::from_value(json!({ "discount": "4001" })).unwrap();
    let err = state.proposal_repo.update(&created.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(
        state.proposal_repo.get(&created.id).await.unwrap().discount,
        Some(dec("100"))
    );
}

// ---
// Quantidades
// ---

#[tokio::test]
async fn quantidade_do_zimmet_precisa_ser_positiva() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let person = state.employee_repo.create(employee("111")).await.unwrap();
    let stock: NewInventoryItem =
        serde_json::from_value(json!({ "name": "Kask", "quantity": "5", "unit": "adet" })).unwrap();
    let stock = state.inventory_repo.create(stock).await.unwrap();

    for qty in ["0", "-1"] {
        let payload: NewAssignment = serde_json::from_value(json!({
            "employeeId": person.id,
            "date": "2025-02-01",
            "items": [{ "inventoryId": stock.id, "quantity": qty }]
        }))
        .unwrap();
        let err = state.assignment_repo.create(payload).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)), "quantidade {qty}");
    }
    assert!(state.assignment_repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn estoque_nao_aceita_quantidade_negativa() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);

    let negative: NewInventoryItem =
        serde_json::from_value(json!({ "name": "Kablo", "quantity": "-3", "unit": "m" })).unwrap();
    let err = state.inventory_repo.create(negative).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let ok: NewInventoryItem =
        serde_json::from_value(json!({ "name": "Kablo", "quantity": "0", "unit": "m" })).unwrap();
    let item = state.inventory_repo.create(ok).await.unwrap();
    let patch = InventoryItemUpdate {
        quantity: Some(dec("-0.5")),
        ..Default::default()
    };
    let err = state.inventory_repo.update(&item.id, patch).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(state.inventory_repo.get(&item.id).await.unwrap().quantity, Decimal::ZERO);
}
