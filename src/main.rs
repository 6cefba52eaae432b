//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use backoffice::{
    config::{AppState, Config},
    handlers,
    middleware::auth::auth_guard,
};

// Planilhas e anexos chegam por multipart
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let admin = config.admin_email.clone().zip(config.admin_password.clone());
    let app_state = AppState::from_config(config)?;

    if let Some((email, password)) = admin {
        app_state
            .auth_service
            .ensure_admin(&email, &password)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao criar o administrador inicial: {}", e))?;
    }

    let auth_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/register", post(handlers::auth::register))
        .route("/change-password", post(handlers::auth::change_password));

    let employee_routes = Router::new()
        .route(
            "/",
            post(handlers::employees::create_employee).get(handlers::employees::list_employees),
        )
        .route(
            "/{id}",
            get(handlers::employees::get_employee)
                .put(handlers::employees::update_employee)
                .delete(handlers::employees::delete_employee),
        )
        .route("/{id}/assignments", get(handlers::employees::list_employee_assignments))
        .route("/{id}/documents", post(handlers::employees::upload_documents))
        .route(
            "/{id}/documents/{name}",
            get(handlers::employees::download_document).delete(handlers::employees::delete_document),
        );

    let inventory_routes = Router::new()
        .route(
            "/",
            post(handlers::inventory::create_item).get(handlers::inventory::list_items),
        )
        .route(
            "/{id}",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        );

    let assignment_routes = Router::new()
        .route(
            "/",
            post(handlers::assignments::create_assignment)
                .get(handlers::assignments::list_assignments),
        )
        .route(
            "/{id}",
            get(handlers::assignments::get_assignment)
                .put(handlers::assignments::update_assignment)
                .delete(handlers::assignments::delete_assignment),
        );

    let proposal_routes = Router::new()
        .route(
            "/",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route(
            "/{id}",
            get(handlers::proposals::get_proposal)
                .put(handlers::proposals::update_proposal)
                .delete(handlers::proposals::delete_proposal),
        )
        .route("/{id}/status", patch(handlers::proposals::set_proposal_status));

    let rate_card_routes = Router::new()
        .route(
            "/",
            post(handlers::rate_cards::create_rate_card).get(handlers::rate_cards::list_rate_cards),
        )
        .route("/template", get(handlers::rate_cards::download_template))
        .route("/preview", post(handlers::rate_cards::preview_import))
        .route("/upload", post(handlers::rate_cards::upload_import))
        .route(
            "/{id}",
            get(handlers::rate_cards::get_rate_card)
                .put(handlers::rate_cards::update_rate_card)
                .delete(handlers::rate_cards::delete_rate_card),
        )
        .route("/{id}/export", get(handlers::rate_cards::export_rate_card))
        .route("/{id}/source", get(handlers::rate_cards::download_source))
        .route("/{id}/pdf", get(handlers::documents::export_rate_card_pdf));

    let note_routes = Router::new()
        .route("/", post(handlers::notes::create_note).get(handlers::notes::list_notes))
        .route(
            "/{id}",
            get(handlers::notes::get_note)
                .put(handlers::notes::update_note)
                .delete(handlers::notes::delete_note),
        )
        .route("/{id}/files", post(handlers::notes::upload_files))
        .route(
            "/{id}/files/{name}",
            get(handlers::notes::download_file).delete(handlers::notes::delete_file),
        )
        .route("/{id}/pdf", get(handlers::documents::export_note_pdf));

    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users))
        .route(
            "/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        );

    // Tudo abaixo exige Bearer válido
    let protected = Router::new()
        .nest("/auth", auth_routes)
        .nest("/employees", employee_routes)
        .nest("/inventory", inventory_routes)
        .nest("/assignments", assignment_routes)
        .nest("/proposals", proposal_routes)
        .nest("/ratecards", rate_card_routes)
        .nest("/notes", note_routes)
        .nest("/users", user_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        // Rotas públicas de autenticação
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/api/auth/reset-password", post(handlers::auth::reset_password))
        .nest("/api", protected)
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
