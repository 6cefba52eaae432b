use std::sync::Arc;

use backoffice::{
    config::{AppState, Config},
    db::{integrity::DeletePolicy, IncomingFile},
    models::{
        assignment::NewAssignment,
        auth::{RegisterUserPayload, ResetPasswordPayload, Role},
        employee::NewEmployee,
        inventory::NewInventoryItem,
        note::NewNote,
    },
    AppError,
};
use serde_json::json;
use tempfile::TempDir;

fn state(tmp: &TempDir) -> AppState {
    AppState::from_config(Config::for_data_dir(tmp.path(), "segredo-de-teste")).unwrap()
}

fn employee(national_id: &str) -> NewEmployee {
    serde_json::from_value(json!({
        "fullName": "Mehmet Yılmaz",
        "nationalId": national_id,
        "birthDate": "1990-05-17",
        "startDate": "2024-01-02",
        "phone": "+90 555 000 00 00"
    }))
    .unwrap()
}

fn item(name: &str) -> NewInventoryItem {
    serde_json::from_value(json!({ "name": name, "quantity": "10", "unit": "adet" })).unwrap()
}

fn assignment(employee_id: &str, inventory_id: &str) -> NewAssignment {
    serde_json::from_value(json!({
        "employeeId": employee_id,
        "date": "2025-02-01",
        "items": [{ "inventoryId": inventory_id, "quantity": "1" }]
    }))
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cadastros_concorrentes_com_mesmo_documento_tem_um_vencedor() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = state.employee_repo.clone();
        handles.push(tokio::spawn(async move { repo.create(employee("12345678901")).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(state.employee_repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn zimmet_com_funcionario_inexistente_nao_altera_a_colecao() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let stock = state.inventory_repo.create(item("Kask")).await.unwrap();

    state.assignment_repo.list().await.unwrap();
    let path = state.store.path_for("assignments");
    let before = std::fs::read(&path).unwrap();

    let err = state
        .assignment_repo
        .create(assignment("E1", &stock.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DanglingReference(ref id) if id == "E1"));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert!(state.assignment_repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn zimmet_com_item_inexistente_e_referencia_pendente() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let emp = state.employee_repo.create(employee("111")).await.unwrap();

    let err = state
        .assignment_repo
        .create(assignment(&emp.id, "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DanglingReference(ref id) if id == "nope"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zimmet_concorrendo_com_exclusao_de_item_nunca_fica_pendente() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let emp = state.employee_repo.create(employee("222")).await.unwrap();

    for round in 0..15 {
        let stock = state
            .inventory_repo
            .create(item(&format!("Telsiz {round}")))
            .await
            .unwrap();

        let assignments = state.assignment_repo.clone();
        let inventory = state.inventory_repo.clone();
        let (emp_id, a_item, d_item) = (emp.id.clone(), stock.id.clone(), stock.id.clone());

        let create = tokio::spawn(async move { assignments.create(assignment(&emp_id, &a_item)).await });
        let delete = tokio::spawn(async move { inventory.delete(&d_item).await });
        let (created, deleted) = (create.await.unwrap(), delete.await.unwrap());

        match (&created, &deleted) {
            (Ok(_), Err(AppError::ReferencedEntity { .. })) => {}
            (Err(AppError::DanglingReference(id)), Ok(())) => assert_eq!(id, &stock.id),
            other => panic!("invalid interleaving: {other:?}"),
        }
    }

    let items = state.inventory_repo.list().await.unwrap();
    for a in state.assignment_repo.list().await.unwrap() {
        for line in &a.items {
            assert!(items.iter().any(|i| i.id == line.inventory_id));
        }
    }
}

#[tokio::test]
async fn exclusao_de_funcionario_bloqueia_ou_cascateia() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let emp = state.employee_repo.create(employee("333")).await.unwrap();
    let stock = state.inventory_repo.create(item("Yelek")).await.unwrap();
    state
        .assignment_repo
        .create(assignment(&emp.id, &stock.id))
        .await
        .unwrap();
    state
        .employee_repo
        .attach_documents(
            &emp.id,
            vec![IncomingFile { name: "kimlik.pdf".into(), bytes: b"pdf".to_vec() }],
        )
        .await
        .unwrap();

    let err = state
        .employee_repo
        .delete(&emp.id, DeletePolicy::Block)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ReferencedEntity { dependents: 1, .. }));

    let report = state
        .employee_repo
        .delete(&emp.id, DeletePolicy::Cascade)
        .await
        .unwrap();
    assert_eq!(report.removed_dependents, 1);
    assert!(report.attachments_removed);
    assert!(state.assignment_repo.list().await.unwrap().is_empty());
    assert!(!tmp.path().join("uploads/employees").join(&emp.id).exists());

    // Sem zimmets, o item pode sair
    state.inventory_repo.delete(&stock.id).await.unwrap();
}

#[tokio::test]
async fn remover_anexo_de_nota_e_idempotente() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    let payload: NewNote = serde_json::from_value(json!({
        "customerName": "Acme",
        "subject": "Toplantı",
        "content": "Çekim takvimi",
        "date": "2025-03-10"
    }))
    .unwrap();
    let note = state.note_repo.create(payload, "u1").await.unwrap();

    let outcomes = state
        .note_repo
        .attach_files(
            &note.id,
            vec![
                IncomingFile { name: "ajanda.txt".into(), bytes: b"1".to_vec() },
                IncomingFile { name: "ajanda.txt".into(), bytes: b"2".to_vec() },
            ],
        )
        .await
        .unwrap();
    assert!(outcomes.iter().all(|o| o.is_success()));
    let stored = outcomes[0].stored_name.clone().unwrap();
    assert_eq!(state.note_repo.get(&note.id).await.unwrap().files.len(), 2);

    let after_first = state.note_repo.remove_file(&note.id, &stored).await.unwrap();
    let after_second = state.note_repo.remove_file(&note.id, &stored).await.unwrap();
    assert_eq!(after_first.files.len(), 1);
    assert_eq!(after_second.files, after_first.files);

    let err = state.note_repo.read_file(&note.id, &stored).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let report = state.note_repo.delete(&note.id).await.unwrap();
    assert!(report.attachments_removed);
    assert!(!tmp.path().join("uploads/notes").join(&note.id).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn token_de_redefinicao_vale_uma_vez_sob_concorrencia() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    state
        .auth_service
        .register(RegisterUserPayload {
            email: "ayse@example.com".into(),
            name: "Ayşe".into(),
            password: "segredo1".into(),
            role: Role::User,
        })
        .await
        .unwrap();

    let token = state
        .auth_service
        .request_password_reset("ayse@example.com")
        .await
        .unwrap()
        .unwrap();

    let auth = Arc::new(state.auth_service.clone());
    let mut handles = Vec::new();
    for i in 0..2 {
        let auth = auth.clone();
        let token = token.token.clone();
        handles.push(tokio::spawn(async move {
            auth.reset_password(ResetPasswordPayload {
                token,
                password: format!("novasenha{i}"),
            })
            .await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(AppError::InvalidToken) => {}
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }
    assert_eq!(ok, 1);

    let err = state
        .auth_service
        .reset_password(ResetPasswordPayload {
            token: token.token,
            password: "outrasenha".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn colecao_corrompida_e_reportada_e_nao_esvaziada() {
    let tmp = TempDir::new().unwrap();
    let state = state(&tmp);
    std::fs::write(state.store.path_for("employees"), b"{ not json").unwrap();

    let err = state.employee_repo.list().await.unwrap_err();
    assert!(matches!(err, AppError::StorageCorruption { .. }));
    let err = state.employee_repo.create(employee("444")).await.unwrap_err();
    assert!(matches!(err, AppError::StorageCorruption { .. }));
}
