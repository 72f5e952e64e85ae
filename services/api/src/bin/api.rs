//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileCredentials, SecretsCredentials, SheetsEntryStore, SmtpNotifier},
    config::{Config, CredentialBackend},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, me_handler, verify_handler},
        doctor::{day_summary_handler, list_dates_handler},
        middleware::require_auth,
        patient::submit_entry_handler,
        sessions::SessionStore,
        state::AppState,
        ApiDoc,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use diet_tracker_core::{
    gate::AuthGate,
    ports::{CredentialStore, EntryStore, Notifier},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Select the Credential Backend & Build the Gate ---
    let credentials: Arc<dyn CredentialStore> = match &config.credentials {
        CredentialBackend::File { path } => {
            info!("Using the JSON-file credential store at {}", path.display());
            Arc::new(FileCredentials::new(path.clone()))
        }
        CredentialBackend::Secrets { path } => {
            info!("Using the read-only secrets store at {}", path.display());
            Arc::new(SecretsCredentials::load(path)?)
        }
    };
    let gate = AuthGate::new(credentials, config.otp_issuer.clone())
        .with_idle_timeout(Duration::minutes(config.session_timeout_minutes));

    // --- 3. Initialize the External Collaborators ---
    let entries: Arc<dyn EntryStore> = Arc::new(SheetsEntryStore::new(
        config.sheets.spreadsheet_id.clone(),
        config.sheets.worksheet.clone(),
        config.sheets.access_token.clone(),
    ));

    let notifier: Option<Arc<dyn Notifier>> = match &config.email {
        Some(email) => Some(Arc::new(SmtpNotifier::new(
            &email.smtp_host,
            email.smtp_port,
            email.username.clone(),
            email.password.clone(),
            email.receiver.clone(),
        )?)),
        None => {
            info!("No SMTP configuration found; submission notifications are disabled.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        gate,
        entries,
        notifier,
        sessions: SessionStore::new(),
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("invalid ALLOWED_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/verify", post(verify_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/entries", post(submit_entry_handler))
        .route("/summary/dates", get(list_dates_handler))
        .route("/summary/{date}", get(day_summary_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
