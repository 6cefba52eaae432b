// src/db/reset_token_repo.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};

use crate::{
    common::error::AppError,
    db::{CollectionStore, Document},
    models::auth::{ResetToken, User},
};

// 32 bytes = 256 bits de entropia
const TOKEN_BYTES: usize = 32;

// Resgate: usuário e tokens travados juntos
const REDEEM_WRITES: &[&str] = &[User::COLLECTION, ResetToken::COLLECTION];
const NO_READS: &[&str] = &[];

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct ResetTokenRepository {
    store: Arc<CollectionStore>,
}

impl ResetTokenRepository {
    pub fn new(store: Arc<CollectionStore>) -> Self {
        Self { store }
    }

    /// Emite um token novo para o e-mail. Qualquer token anterior do mesmo
    /// e-mail é descartado e os expirados são limpos na mesma gravação.
    pub async fn issue(&self, email: &str, ttl: Duration) -> Result<ResetToken, AppError> {
        let email = email.trim().to_lowercase();

        self.store
            .mutate::<ResetToken, _, _>(move |tokens| {
                let now = Utc::now();
                tokens.retain(|t| t.email != email && !t.is_expired_at(now));

                let token = ResetToken {
                    email,
                    token: generate_token(),
                    expires_at: now + ttl,
                };
                tokens.push(token.clone());
                tracing::info!(email = %token.email, "Token de redefinição emitido");
                Ok(token)
            })
            .await
    }

    pub async fn find(&self, token: &str) -> Result<Option<ResetToken>, AppError> {
        self.store.find::<ResetToken>(token).await
    }

    /// Remove o token. Ausente não é erro.
    pub async fn delete(&self, token: &str) -> Result<(), AppError> {
        let token = token.to_string();
        self.store
            .mutate::<ResetToken, _, _>(move |tokens| {
                tokens.retain(|t| t.token != token);
                Ok(())
            })
            .await
    }

    /// Consome o token trocando o hash da senha do dono.
    ///
    /// O usuário é gravado primeiro; a remoção do token vem depois e uma
    /// falha nela só gera log (o token expira de qualquer forma).
    /// Devolve o id do usuário atualizado.
    pub async fn redeem(&self, token: &str, password_hash: String) -> Result<String, AppError> {
        let token = token.to_string();

        self.store
            .transact(REDEEM_WRITES, NO_READS, move |tx| {
                let mut tokens = tx.load::<ResetToken>()?;
                let idx = tokens
                    .iter()
                    .position(|t| t.token == token)
                    .ok_or(AppError::InvalidToken)?;
                if tokens[idx].is_expired_at(Utc::now()) {
                    return Err(AppError::ExpiredToken);
                }
                let redeemed = tokens.remove(idx);

                let mut users = tx.load::<User>()?;
                let user = users
                    .iter_mut()
                    .find(|u| u.email.trim().eq_ignore_ascii_case(&redeemed.email))
                    .ok_or(AppError::InvalidToken)?;
                user.password_hash = password_hash;
                user.updated_at = Utc::now();
                let user_id = user.id.clone();

                tx.stage(&users)?;
                tx.stage_best_effort(&tokens)?;
                Ok(user_id)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(tmp: &TempDir) -> ResetTokenRepository {
        let store = Arc::new(CollectionStore::new(tmp.path(), std::time::Duration::from_secs(2)));
        ResetTokenRepository::new(store)
    }

    #[test]
    fn token_tem_256_bits_em_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn novo_token_substitui_o_anterior_do_mesmo_email() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);

        let first = repo.issue("a@x.com", Duration::hours(24)).await.unwrap();
        let second = repo.issue("A@x.com ", Duration::hours(24)).await.unwrap();
        repo.issue("b@x.com", Duration::hours(24)).await.unwrap();

        assert!(repo.find(&first.token).await.unwrap().is_none());
        assert_eq!(repo.find(&second.token).await.unwrap().unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn expirados_sao_limpos_na_emissao() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);

        let stale = repo.issue("a@x.com", Duration::seconds(-1)).await.unwrap();
        repo.issue("b@x.com", Duration::hours(24)).await.unwrap();

        assert!(repo.find(&stale.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_inexistente_e_invalido_e_expirado_e_expirado() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);

        let err = repo.redeem("nope", "h".into()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));

        let stale = repo.issue("a@x.com", Duration::seconds(-1)).await.unwrap();
        let err = repo.redeem(&stale.token, "h".into()).await.unwrap_err();
        assert!(matches!(err, AppError::ExpiredToken));
    }
}
