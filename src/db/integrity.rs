// src/db/integrity.rs
//
// Regras de integridade referencial entre coleções. As funções são puras:
// os repositórios as chamam dentro de `CollectionStore::transact`, com as
// coleções envolvidas travadas, para que verificação e gravação sejam atômicas.

use serde::Deserialize;

use crate::{
    common::error::AppError,
    models::{
        assignment::{Assignment, AssignmentItem},
        employee::Employee,
        inventory::InventoryItem,
    },
};

/// O que fazer com os zimmets de um funcionário que está sendo excluído.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Recusa a exclusão enquanto houver zimmets (`ReferencedEntity`).
    #[default]
    Block,
    /// Exclui os zimmets do funcionário na mesma operação.
    Cascade,
}

/// Falha com `DanglingReference(id)` no primeiro id que não existe.
/// O funcionário é verificado antes dos itens.
pub fn check_assignment_references(
    employees: &[Employee],
    inventory: &[InventoryItem],
    employee_id: &str,
    items: &[AssignmentItem],
) -> Result<(), AppError> {
    if !employees.iter().any(|e| e.id == employee_id) {
        return Err(AppError::DanglingReference(employee_id.to_string()));
    }
    for item in items {
        if !inventory.iter().any(|i| i.id == item.inventory_id) {
            return Err(AppError::DanglingReference(item.inventory_id.clone()));
        }
    }
    Ok(())
}

pub fn assignments_of_employee(assignments: &[Assignment], employee_id: &str) -> usize {
    assignments
        .iter()
        .filter(|a| a.employee_id == employee_id)
        .count()
}

pub fn assignments_using_item(assignments: &[Assignment], inventory_id: &str) -> usize {
    assignments
        .iter()
        .filter(|a| a.items.iter().any(|i| i.inventory_id == inventory_id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn employee(id: &str) -> Employee {
        Employee {
            id: id.into(),
            full_name: "X".into(),
            national_id: id.into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            social_security_no: String::new(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: None,
            is_active: true,
            phone: String::new(),
            documents: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(id: &str) -> InventoryItem {
        InventoryItem {
            id: id.into(),
            name: "Kamera".into(),
            quantity: Decimal::ONE,
            unit: "adet".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(inventory_id: &str) -> AssignmentItem {
        AssignmentItem {
            inventory_id: inventory_id.into(),
            quantity: Decimal::ONE,
        }
    }

    #[test]
    fn funcionario_inexistente_e_reportado_pelo_id() {
        let err = check_assignment_references(&[], &[item("I1")], "E1", &[line("I1")]).unwrap_err();
        assert!(matches!(err, AppError::DanglingReference(ref id) if id == "E1"));
    }

    #[test]
    fn item_inexistente_e_reportado_pelo_id() {
        let err = check_assignment_references(
            &[employee("E1")],
            &[item("I1")],
            "E1",
            &[line("I1"), line("I2")],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::DanglingReference(ref id) if id == "I2"));
    }

    #[test]
    fn referencias_validas_passam() {
        check_assignment_references(&[employee("E1")], &[item("I1")], "E1", &[line("I1")]).unwrap();
    }

    #[test]
    fn politica_padrao_e_bloquear() {
        assert_eq!(DeletePolicy::default(), DeletePolicy::Block);
        let parsed: DeletePolicy = serde_json::from_str("\"cascade\"").unwrap();
        assert_eq!(parsed, DeletePolicy::Cascade);
    }
}
