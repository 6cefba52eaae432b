// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    db::{
        AssignmentRepository, BlobStore, CollectionStore, EmployeeRepository, FsBlobStore,
        InventoryRepository, NoteRepository, ProposalRepository, RateCardRepository,
        ResetTokenRepository, UserRepository,
    },
    services::{
        auth::AuthService,
        document_service::{DocumentRenderer, PdfRenderer},
    },
};

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
const DEFAULT_JWT_TTL_HOURS: i64 = 24;

// Configuração lida do ambiente (e do .env, se existir)
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub lock_timeout: Duration,
    pub bind_addr: String,
    pub font_dir: PathBuf,
    pub font_family: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    // Sem envio de e-mail: em desenvolvimento o token volta na resposta
    pub expose_reset_tokens: bool,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(var_or("DATA_DIR", "./data"));
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("uploads"));

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let jwt_ttl_hours = var_or("JWT_TTL_HOURS", &DEFAULT_JWT_TTL_HOURS.to_string())
            .parse()
            .context("JWT_TTL_HOURS deve ser um número inteiro")?;
        let lock_timeout_ms: u64 = var_or("STORE_LOCK_TIMEOUT_MS", &DEFAULT_LOCK_TIMEOUT_MS.to_string())
            .parse()
            .context("STORE_LOCK_TIMEOUT_MS deve ser um número inteiro")?;

        Ok(Self {
            data_dir,
            upload_dir,
            jwt_secret,
            jwt_ttl_hours,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            font_dir: PathBuf::from(var_or("FONT_DIR", "./fonts")),
            font_family: var_or("FONT_FAMILY", "Roboto"),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
            expose_reset_tokens: var_or("EXPOSE_RESET_TOKENS", "false") == "true",
        })
    }

    /// Configuração mínima apontando para um diretório de dados (testes).
    pub fn for_data_dir(data_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        let data_dir = data_dir.into();
        Self {
            upload_dir: data_dir.join("uploads"),
            data_dir,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: DEFAULT_JWT_TTL_HOURS,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            bind_addr: "127.0.0.1:0".to_string(),
            font_dir: PathBuf::from("./fonts"),
            font_family: "Roboto".to_string(),
            admin_email: None,
            admin_password: None,
            expose_reset_tokens: false,
        }
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<CollectionStore>,
    pub employee_repo: EmployeeRepository,
    pub inventory_repo: InventoryRepository,
    pub assignment_repo: AssignmentRepository,
    pub proposal_repo: ProposalRepository,
    pub rate_card_repo: RateCardRepository,
    pub note_repo: NoteRepository,
    pub user_repo: UserRepository,
    pub auth_service: AuthService,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Não foi possível criar {}", config.data_dir.display()))?;
        std::fs::create_dir_all(&config.upload_dir)
            .with_context(|| format!("Não foi possível criar {}", config.upload_dir.display()))?;

        // --- Monta o gráfico de dependências ---
        let store = Arc::new(CollectionStore::new(&config.data_dir, config.lock_timeout));
        let employee_files: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.upload_dir, "employees"));
        let note_files: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.upload_dir, "notes"));
        let rate_card_files: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.upload_dir, "ratecards"));

        let user_repo = UserRepository::new(store.clone());
        let auth_service = AuthService::new(
            user_repo.clone(),
            ResetTokenRepository::new(store.clone()),
            config.jwt_secret.clone(),
            chrono::Duration::hours(config.jwt_ttl_hours),
        );
        let renderer: Arc<dyn DocumentRenderer> =
            Arc::new(PdfRenderer::new(&config.font_dir, config.font_family.clone()));

        tracing::info!(data_dir = %config.data_dir.display(), "Store de coleções pronto");

        Ok(Self {
            employee_repo: EmployeeRepository::new(store.clone(), employee_files),
            inventory_repo: InventoryRepository::new(store.clone()),
            assignment_repo: AssignmentRepository::new(store.clone()),
            proposal_repo: ProposalRepository::new(store.clone()),
            rate_card_repo: RateCardRepository::new(store.clone(), rate_card_files),
            note_repo: NoteRepository::new(store.clone(), note_files),
            user_repo,
            auth_service,
            renderer,
            store,
            config: Arc::new(config),
        })
    }
}
