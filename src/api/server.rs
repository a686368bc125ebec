//! SINAPI API Server implementation
//!
//! HTTP REST API server using Axum. Workbook parsing and store access are
//! blocking, so every import runs on the blocking thread pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::error::SinapiResult;
use crate::store::{MemoryStore, PostgrestStore, RecordStore, StoreConfig};
use crate::types::SourceType;

pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

/// Where imported records go.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Process-local; lost on shutdown.
    Memory(Arc<MemoryStore>),
    /// Supabase over PostgREST. The blocking client is built per call, on the
    /// blocking pool.
    Postgrest(StoreConfig),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Postgrest(_) => "postgrest",
        }
    }

    /// Run `f` against the backing store. Must be called from a blocking context.
    pub fn with_store<R>(
        &self,
        f: impl FnOnce(&dyn RecordStore) -> SinapiResult<R>,
    ) -> SinapiResult<R> {
        match self {
            StoreBackend::Memory(store) => f(store.as_ref()),
            StoreBackend::Postgrest(config) => {
                let store = PostgrestStore::new(config.clone())?;
                f(&store)
            }
        }
    }
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub version: String,
    pub source: SourceType,
    pub store: StoreBackend,
}

impl AppState {
    pub fn new(store: StoreBackend) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            source: SourceType::Sinapi,
            store,
        }
    }
}

/// All routes with middleware, ready to serve or to drive from tests.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // SINAPI endpoints
        .route("/api/v1/sinapi/upload", post(handlers::upload_metadata))
        .route("/api/v1/sinapi/import", post(handlers::import_sinapi))
        .route("/api/v1/sinapi/prices/:code", get(handlers::find_price))
        // State and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, store: StoreBackend) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sinapi_server=info,sinapi_forge=info,tower_http=info".into()
            }),
        )
        .init();

    let backend = store.name();
    let state = Arc::new(AppState::new(store));
    let app = build_router(state, config.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🏗️  SINAPI API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/sinapi/upload, /api/v1/sinapi/import, /api/v1/sinapi/prices/:code");
    info!("   Health: /health, Version: /version");
    info!(
        "   Store: {}, max upload: {} MB",
        backend,
        config.max_upload_bytes / (1024 * 1024)
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SINAPI API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ApiConfig Tests ====================

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_config_address_format() {
        let config = ApiConfig {
            host: "192.168.1.100".to_string(),
            port: 9090,
            ..ApiConfig::default()
        };
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().unwrap();
        assert_eq!(addr.port(), 9090);
    }

    // ==================== StoreBackend Tests ====================

    #[test]
    fn test_memory_backend_runs_closure() {
        let memory = Arc::new(MemoryStore::new());
        let backend = StoreBackend::Memory(Arc::clone(&memory));
        assert_eq!(backend.name(), "memory");
        let name = backend.with_store(|store| Ok(store.name().to_string())).unwrap();
        assert_eq!(name, "memory");
    }

    #[test]
    fn test_postgrest_backend_rejects_bad_config() {
        let backend = StoreBackend::Postgrest(StoreConfig::default());
        assert_eq!(backend.name(), "postgrest");
        assert!(backend.with_store(|_| Ok(())).is_err());
    }

    // ==================== AppState Tests ====================

    #[test]
    fn test_app_state_version_and_source() {
        let state = AppState::new(StoreBackend::Memory(Arc::new(MemoryStore::new())));
        assert_eq!(state.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(state.source, SourceType::Sinapi);
    }
}
