// src/db/user_repo.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::CollectionStore,
    models::{
        auth::{NewUserRecord, User, UserUpdate},
        new_id,
    },
};

const ENTITY: &str = "Usuário";

// E-mails são comparados sem caixa e sem espaços nas pontas
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn ensure_unique_email(users: &[User], email: &str, except_id: Option<&str>) -> Result<(), AppError> {
    let taken = users
        .iter()
        .any(|u| normalize_email(&u.email) == email && Some(u.id.as_str()) != except_id);
    if taken {
        return Err(AppError::Conflict(format!("O e-mail '{}' já está em uso.", email)));
    }
    Ok(())
}

// O repositório de usuários, responsável pela coleção 'users'
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<CollectionStore>,
}

impl UserRepository {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.store.load::<User>().await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    pub async fn get(&self, id: &str) -> Result<User, AppError> {
        self.store
            .find::<User>(id)
            .await?
            .ok_or_else(|| AppError::not_found(ENTITY, id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        Ok(self
            .store
            .load::<User>()
            .await?
            .into_iter()
            .find(|u| normalize_email(&u.email) == email))
    }

    // Cria um novo usuário; e-mail duplicado vira `Conflict`
    pub async fn create(&self, record: NewUserRecord) -> Result<User, AppError> {
        self.store
            .mutate::<User, _, _>(move |users| {
                let email = normalize_email(&record.email);
                ensure_unique_email(users, &email, None)?;

                let now = Utc::now();
                let user = User {
                    id: new_id(),
                    email,
                    name: record.name.trim().to_string(),
                    password_hash: record.password_hash,
                    role: record.role,
                    created_at: now,
                    updated_at: now,
                };
                users.push(user.clone());
                tracing::info!(id = %user.id, role = ?user.role, "Usuário criado");
                Ok(user)
            })
            .await
    }

    pub async fn update(&self, id: &str, patch: UserUpdate) -> Result<User, AppError> {
        patch.validate()?;
        let id = id.to_string();

        self.store
            .mutate::<User, _, _>(move |users| {
                let idx = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

                let mut updated = users[idx].clone();
                if let Some(email) = patch.email {
                    let email = normalize_email(&email);
                    ensure_unique_email(users, &email, Some(&id))?;
                    updated.email = email;
                }
                if let Some(name) = patch.name {
                    updated.name = name.trim().to_string();
                }
                if let Some(role) = patch.role {
                    updated.role = role;
                }
                updated.updated_at = Utc::now();
                users[idx] = updated.clone();
                Ok(updated)
            })
            .await
    }

    /// Troca só o hash; quem chama já validou e gerou o hash.
    pub async fn set_password_hash(&self, id: &str, password_hash: String) -> Result<(), AppError> {
        let id = id.to_string();

        self.store
            .mutate::<User, _, _>(move |users| {
                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                user.password_hash = password_hash;
                user.updated_at = Utc::now();
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = id.to_string();

        self.store
            .mutate::<User, _, _>(move |users| {
                let idx = users
                    .iter()
                    .position(|u| u.id == id)
                    .ok_or_else(|| AppError::not_found(ENTITY, &id))?;
                users.remove(idx);
                Ok(())
            })
            .await
    }
}
