//! CopyFlow API Gateway
//!
//! The main entry point for all programmatic API requests.
//! Handles:
//! - API key authentication and scope checks
//! - Per-credential rate limiting with X-RateLimit-* headers
//! - Single-item generation, analysis variants, bulk submission/polling
//! - Usage analytics and API key management
//! - Observability (logging, metrics, tracing)

mod auth;
mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use copyflow_common::{
    config::AppConfig,
    content::MAX_IMAGE_BYTES,
    db::DbPool,
    generation::{scrape::HttpPageFetcher, scrape::ProductPageFetcher, CopyEngine, OpenAiChatModel},
    metrics as app_metrics,
    queue::{Queue, QueueConfig},
    ratelimit::RateLimiter,
    usage::UsageLedger,
    Repository,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub engine: Arc<CopyEngine>,
    pub fetcher: Option<Arc<dyn ProductPageFetcher>>,
    pub queue: Option<Arc<Queue>>,
    pub ledger: UsageLedger,
    pub limiter: RateLimiter,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .json()
        .init();

    info!("Starting CopyFlow API Gateway v{}", copyflow_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    app_metrics::register_metrics();

    if config.observability.metrics_port > 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        if let Err(e) = PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
        {
            tracing::warn!(error = %e, "Failed to install Prometheus exporter");
        } else {
            info!("Metrics exporter listening on {}", metrics_addr);
        }
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Repository::new(db);

    // Generation engine and its external capabilities
    let model = Arc::new(OpenAiChatModel::new(&config.generation)?);
    let engine = Arc::new(CopyEngine::new(
        model,
        &config.generation,
        config.scrape.allowed_domains.clone(),
    ));

    let fetcher: Option<Arc<dyn ProductPageFetcher>> = if config.scrape.api_base.is_some() {
        Some(Arc::new(HttpPageFetcher::new(&config.scrape)?))
    } else {
        tracing::warn!("scrape.api_base not set; URL analysis is unavailable");
        None
    };

    // Bulk queue (submission degrades to the worker resume scan without it)
    let queue = match config.queue.bulk_queue_url.clone() {
        Some(url) => {
            info!(url = %url, "Connecting to bulk queue...");
            let queue_config = QueueConfig {
                url,
                dlq_url: config.queue.dlq_url.clone(),
                visibility_timeout: config.queue.visibility_timeout_secs as i32,
                wait_time_seconds: config.queue.poll_timeout_secs as i32,
                max_messages: config.queue.batch_size as i32,
            };
            Some(Arc::new(Queue::new(queue_config).await?))
        }
        None => {
            tracing::warn!("queue.bulk_queue_url not set; bulk jobs rely on the worker resume scan");
            None
        }
    };

    // Create app state
    let state = AppState {
        config: config.clone(),
        repository: repository.clone(),
        engine,
        fetcher,
        queue,
        ledger: UsageLedger::new(repository.clone()),
        limiter: RateLimiter::new(repository),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Programmatic API routes (bearer auth inside each handler)
    let api_routes = Router::new()
        // Generation endpoints
        .route("/generate", post(handlers::generate::generate))
        .route("/generate/viral", post(handlers::generate::generate_viral))
        // Analysis variants
        .route("/analyze/url", post(handlers::analyze::analyze_url))
        .route("/analyze/image", post(handlers::analyze::analyze_image))
        // Bulk endpoints
        .route("/bulk", post(handlers::bulk::submit))
        .route("/bulk", get(handlers::bulk::status))
        // Usage analytics
        .route("/usage", get(handlers::usage::report))
        // Key management
        .route("/keys", get(handlers::keys::list))
        .route("/keys", post(handlers::keys::create))
        .route("/keys/{id}", delete(handlers::keys::deactivate));

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        // Image uploads run past the default body cap
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id);

    // Process-wide backstop limiter in front of everything
    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn(move |request, next| {
            let limiter = limiter.clone();
            async move {
                middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
            }
        }));
    }

    app.with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
