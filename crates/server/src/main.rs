mod error;
mod jobs;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use herdbook_api::crypto::{parse_seal_key, DEFAULT_TOKEN_TTL_SECS, SEAL_KEY_LEN};
use herdbook_registry::{IrzClient, IrzConfig, IrzMode};
use herdbook_store::Store;

use jobs::JobRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: Arc<IrzClient>,
    pub jobs: JobRegistry,
    pub config: AppConfig,
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub seal_key: [u8; SEAL_KEY_LEN],
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Registry endpoints and mode, defaulting to the test environment.
fn load_registry_config() -> IrzConfig {
    let mut config = IrzConfig::default();
    if let Some(url) = env_nonempty("IRZ_API_BASE_URL") {
        config.base_url = url;
    }
    if let Some(url) = env_nonempty("IRZ_SSO_URL") {
        config.sso_url = url;
    }
    if let Some(id) = env_nonempty("IRZ_CLIENT_ID") {
        config.client_id = id;
    }
    if let Some(mode) = env_nonempty("IRZ_MODE") {
        config.mode = mode.parse().unwrap_or(IrzMode::Test);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herdbook_server=info,tower_http=info".into()),
        )
        .init();

    // Data directory
    let data_dir = std::env::var("HERDBOOK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    tracing::info!("data directory: {}", data_dir.display());

    let store = Arc::new(Store::open(&data_dir)?);
    tracing::info!("database initialized");

    // Both secrets are required: tokens and sealed registry passwords are
    // worthless if they can be minted or read with a default key.
    let token_secret = env_nonempty("HERDBOOK_SECRET")
        .ok_or_else(|| anyhow::anyhow!("HERDBOOK_SECRET must be set"))?;
    let seal_key_hex = env_nonempty("HERDBOOK_SEAL_KEY")
        .ok_or_else(|| anyhow::anyhow!("HERDBOOK_SEAL_KEY must be set"))?;
    let seal_key =
        parse_seal_key(&seal_key_hex).map_err(|e| anyhow::anyhow!("HERDBOOK_SEAL_KEY: {e}"))?;
    let token_ttl_secs = env_nonempty("TOKEN_TTL_SECS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

    let registry_config = load_registry_config();
    tracing::info!("registry mode: {}", registry_config.mode.as_str());
    let registry = Arc::new(IrzClient::new(registry_config)?);

    let state = AppState {
        store,
        registry,
        jobs: jobs::new_registry(),
        config: AppConfig {
            token_secret,
            token_ttl_secs,
            seal_key,
        },
    };

    // Build API routes
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/me", get(routes::auth::me))
        // Farms
        .route(
            "/farms",
            get(routes::farms::list_farms).post(routes::farms::create_farm),
        )
        .route(
            "/farms/{id}",
            get(routes::farms::get_farm).put(routes::farms::update_farm),
        )
        .route(
            "/farms/{id}/irz-credentials",
            post(routes::farms::set_irz_credentials),
        )
        // Animals
        .route(
            "/animals/farm/{farm_id}",
            get(routes::animals::list_farm_animals),
        )
        .route(
            "/animals/farm/{farm_id}/species/{species}",
            get(routes::animals::list_farm_animals_by_species),
        )
        .route("/animals/{id}", get(routes::animals::get_animal))
        .route(
            "/animals/{id}/registry",
            get(routes::animals::get_animal_registry),
        )
        // Documents
        .route(
            "/documents/farm/{farm_id}",
            get(routes::documents::list_farm_documents),
        )
        .route(
            "/documents/birth-report",
            post(routes::documents::create_birth_report),
        )
        .route(
            "/documents/death-report",
            post(routes::documents::create_death_report),
        )
        .route(
            "/documents/transfer-report",
            post(routes::documents::create_transfer_report),
        )
        .route("/documents/{id}", get(routes::documents::get_document))
        .route(
            "/documents/{id}/submit",
            post(routes::documents::submit_document),
        )
        // Sync
        .route("/sync/start", post(routes::sync::start_sync))
        .route("/sync/status/{job_id}", get(routes::sync::sync_status))
        .route("/sync/logs/{farm_id}", get(routes::sync::sync_logs))
        // Registry read-throughs
        .route(
            "/registry/poultry/farm/{farm_id}",
            get(routes::registry::poultry),
        )
        .route(
            "/registry/poultry-events/farm/{farm_id}",
            get(routes::registry::poultry_events),
        )
        .route(
            "/registry/pig-herds/farm/{farm_id}",
            get(routes::registry::pig_herds),
        )
        // Dashboard
        .route("/dashboard/stats/{farm_id}", get(routes::dashboard::stats))
        .route(
            "/dashboard/activity/{farm_id}",
            get(routes::dashboard::recent_activity),
        )
        .route(
            "/dashboard/reminders/{farm_id}",
            get(routes::dashboard::reminders),
        )
        .route(
            "/dashboard/activity-logs",
            get(routes::dashboard::activity_logs),
        );

    let app = Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("listening on port {port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
