//! HTTP server bootstrap for the raffle backend.
//!
//! This module wires together:
//! - configuration
//! - the raffle store (PostgreSQL or in-memory)
//! - the ledger client, ticket encoder and optional content store
//! - the Axum router with graceful shutdown

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::handlers::{health_check, readiness_check};
use crate::infra::{
    shutdown_signal, ContentStoreConfig, InMemoryRaffleStore, PgRaffleStore, PinataContentStore,
    RaffleStore, RequestTracker, ShutdownCoordinator,
};
use crate::ledger::{AlloyLedgerClient, LedgerConfig};
use crate::service::{RaffleService, ServiceConfig, DEFAULT_MAX_TICKETS_PER_REQUEST};
use crate::ticketing::QrTicketEncoder;

/// Which raffle store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("Unknown STORE_BACKEND {other:?} (expected postgres or memory)"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum database connections.
    pub max_connections: u32,
    pub migrate_on_startup: bool,
    pub service: ServiceConfig,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = env_parse("PORT").unwrap_or(5000);
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/raffle".to_string());

        let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
            .ok()
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self {
            listen_addr,
            store_backend,
            database_url,
            max_connections: env_parse("MAX_DB_CONNECTIONS").unwrap_or(10),
            migrate_on_startup,
            service: ServiceConfig {
                end_time_override_secs: env_parse("RAFFLE_END_TIME_OVERRIDE_SECS"),
                max_tickets_per_request: env_parse("MAX_TICKETS_PER_REQUEST")
                    .unwrap_or(DEFAULT_MAX_TICKETS_PER_REQUEST),
            },
            drain_timeout: Duration::from_secs(env_parse("SHUTDOWN_DRAIN_SECS").unwrap_or(10)),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RaffleService>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting raffle backend v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Store backend: {:?}", config.store_backend);
    info!(
        "  Max tickets per request: {}",
        config.service.max_tickets_per_request
    );
    if let Some(secs) = config.service.end_time_override_secs {
        warn!("Raffle end time override active: raffles end {}s after creation", secs);
    }

    let store: Arc<dyn RaffleStore> = match config.store_backend {
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;
            info!("Connected to PostgreSQL");

            if config.migrate_on_startup {
                info!("Running database migrations...");
                crate::migrations::run_postgres(&pool).await?;
                info!("Database migrations applied");
            } else {
                info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
            }
            Arc::new(PgRaffleStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; state is lost on restart");
            Arc::new(InMemoryRaffleStore::new())
        }
    };

    let ledger_config = LedgerConfig::from_env().context(
        "Ledger not configured (set RAFFLE_RPC_URL, RAFFLE_CONTRACT_ADDRESS, RAFFLE_OWNER_PRIVATE_KEY)",
    )?;
    info!("Ledger configured:");
    info!("  RPC URL: {}", ledger_config.rpc_url);
    info!("  Contract: {:?}", ledger_config.contract_address);
    info!("  Chain ID: {}", ledger_config.chain_id);
    let ledger = Arc::new(AlloyLedgerClient::new(ledger_config));

    let mut service = RaffleService::new(
        ledger,
        store.clone(),
        Arc::new(QrTicketEncoder::default()),
        config.service.clone(),
    );
    match ContentStoreConfig::from_env() {
        Some(content_config) => {
            info!("Content store configured: {}", content_config.api_url);
            service = service.with_content_store(Arc::new(PinataContentStore::new(content_config)?));
        }
        None => info!("Content store not configured (set PINATA_JWT to enable NFT deployment)"),
    }

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let state = AppState {
        service: Arc::new(service),
        shutdown: shutdown.clone(),
    };

    let app = build_router(state, cors_layer_from_env()?);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Raffle backend is ready to accept connections");
    let signal_coordinator = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_coordinator.shutdown();
    });

    serve_until_shutdown(listener, app, shutdown.clone(), config.drain_timeout).await?;

    store.close().await;
    info!(
        requests_served = shutdown.request_tracker().total_count(),
        "Shutdown complete"
    );

    Ok(())
}

/// Serve `app` until `shutdown` fires, then give in-flight requests at most
/// `drain_timeout` to finish.
pub async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: Arc<ShutdownCoordinator>,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let graceful = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { graceful.wait().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return Ok(result?),
        _ = shutdown.wait() => {}
    }

    if let Some(result) = shutdown.drain(server, drain_timeout).await {
        result?;
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let json = std::env::var("LOG_JSON")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the full application router: `/api`, health probes, tracing and CORS.
pub fn build_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let tracker = state.shutdown.request_tracker();
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        tracker,
        track_in_flight,
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors {
        router = router.layer(cors_layer);
    }

    router.with_state(state)
}

async fn track_in_flight(
    State(tracker): State<Arc<RequestTracker>>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = tracker.request_start();
    next.run(request).await
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_shutdown_abandons_stalled_request_after_drain_timeout() {
        let entered = Arc::new(Notify::new());
        let handler_entered = entered.clone();
        let app = Router::new().route(
            "/stall",
            get(move || {
                let entered = handler_entered.clone();
                async move {
                    entered.notify_one();
                    std::future::pending::<()>().await;
                    StatusCode::OK
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let server = tokio::spawn(serve_until_shutdown(
            listener,
            app,
            shutdown.clone(),
            Duration::from_millis(100),
        ));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /stall HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        entered.notified().await;

        shutdown.shutdown();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server must stop once the drain timeout elapses")
            .unwrap();
        assert!(result.is_ok());
        drop(client);
    }

    #[tokio::test]
    async fn test_shutdown_with_idle_server_returns_promptly() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let server = tokio::spawn(serve_until_shutdown(
            listener,
            Router::new(),
            shutdown.clone(),
            Duration::from_secs(30),
        ));

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
