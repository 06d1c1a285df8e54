pub mod backends;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod history;
pub mod llm;
pub mod orchestration;
pub mod sessions;
pub mod tools;

use std::sync::Arc;

use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use backends::{FsAnnouncementStore, LexicalPolicyIndex, SqliteEmployeeDirectory};
use config::AppConfig;
use error::AppError;
use handlers::AppState;
use llm::{LlmProviderTrait, LlmRegistry};
use orchestration::Orchestrator;
use sessions::SessionManager;

/// SQLite creates the database file but not its parent directory.
async fn ensure_database_dir(config: &AppConfig) -> Result<(), AppError> {
    if let Some(parent) = config.database_file().as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Recreates the employee database with the demo records. Returns the number
/// of employees inserted.
pub async fn seed_database(config: &AppConfig) -> Result<usize, AppError> {
    if let Some(file) = config.database_file() {
        match tokio::fs::remove_file(&file).await {
            Ok(()) => tracing::info!("Removed old database {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    ensure_database_dir(config).await?;

    let directory = SqliteEmployeeDirectory::connect(&config.database_url).await?;
    let inserted = directory
        .seed_demo_data(chrono::Local::now().date_naive())
        .await?;
    tracing::info!("Seeded {inserted} employees into {}", config.database_url);
    Ok(inserted)
}

/// Opens the three backends named in `config` and registers the HR tools.
pub async fn init_tool_registry(config: &AppConfig) -> Result<tools::ToolRegistry, AppError> {
    ensure_database_dir(config).await?;
    let employees = SqliteEmployeeDirectory::connect(&config.database_url).await?;
    let announcements = FsAnnouncementStore::new(config.announcements_dir.clone());
    let policies = match LexicalPolicyIndex::load(&config.policies_dir).await {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("Policy documents unavailable, searches will return nothing: {e}");
            LexicalPolicyIndex::from_documents(Vec::new())
        }
    };

    let registry = tools::ToolRegistry::with_backends(
        Arc::new(employees),
        Arc::new(announcements),
        Arc::new(policies),
    )?;
    tracing::info!(
        "ToolRegistry initialized with {} tools: {:?}",
        registry.len(),
        registry.tool_names()
    );
    Ok(registry)
}

/// Resolves the provider selected by `HRDESK_PROVIDER` among those whose API
/// keys are configured.
pub fn init_provider(config: &AppConfig) -> Result<Arc<dyn LlmProviderTrait>, AppError> {
    let registry = LlmRegistry::from_env();
    let provider = registry.require(&config.provider)?;
    tracing::info!("Using provider {} with model {}", provider.name(), config.model);
    Ok(provider)
}

/// A standalone orchestrator for the terminal front ends.
pub async fn init_orchestrator(config: &AppConfig) -> Result<Orchestrator, AppError> {
    let provider = init_provider(config)?;
    let tools = Arc::new(init_tool_registry(config).await?);
    Ok(Orchestrator::new(provider, tools, config.model_settings()))
}

pub fn build_router(state: AppState) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/tools", get(handlers::list_tools_handler))
        .route("/api/sessions", post(handlers::create_session_handler))
        .route(
            "/api/sessions/{id}",
            axum::routing::delete(handlers::delete_session_handler),
        )
        .route(
            "/api/sessions/{id}/turns",
            post(handlers::submit_turn_handler),
        )
        .route(
            "/api/sessions/{id}/history",
            get(handlers::get_history_handler),
        )
        .route(
            "/api/sessions/{id}/reset",
            post(handlers::reset_session_handler),
        )
        .route("/api/sessions/{id}/stats", get(handlers::get_stats_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves the HTTP API on `bind` until Ctrl-C.
pub async fn serve(config: &AppConfig, bind: &str) -> Result<(), AppError> {
    let provider = init_provider(config)?;
    let tools = Arc::new(init_tool_registry(config).await?);
    let state = AppState {
        sessions: SessionManager::new(provider, tools, config.model_settings()),
    };

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!("API server listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
