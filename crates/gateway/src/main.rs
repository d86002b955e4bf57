//! LexForge API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Query submission (fire-and-poll)
//! - Published result polling
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use lexforge_analysis::context::ContextBuilder;
use lexforge_analysis::orchestrator::Orchestrator;
use lexforge_analysis::publish::Publisher;
use lexforge_analysis::terms::TermExtractor;
use lexforge_common::{
    config::AppConfig,
    embeddings, generation,
    knowledge::KnowledgeBase,
    metrics, tagger,
};
use std::net::SocketAddr;
use std::path::PathBuf;
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
    pub knowledge: Arc<KnowledgeBase>,
    pub orchestrator: Arc<Orchestrator>,
    pub publisher: Arc<Publisher>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;
    let config = Arc::new(config);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting LexForge API Gateway v{}", lexforge_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Metrics exporter listening on {}", addr);
    }

    // Load the knowledge base before serving; failure here is fatal
    info!("Loading knowledge base...");
    let knowledge = Arc::new(KnowledgeBase::load(&config.knowledge)?);

    // Wire up external capabilities
    let embedder = embeddings::create_embedder(&config.embedding)?;
    let entity_tagger = tagger::create_tagger(&config.tagger)?;
    let generator = generation::create_generator(&config.generation)?;

    // Assemble the pipeline
    let orchestrator = Arc::new(Orchestrator::new(
        TermExtractor::new(entity_tagger, config.retrieval.clone()),
        ContextBuilder::new(embedder, config.retrieval.clone()),
        generator,
        knowledge.clone(),
        config.generation.clone(),
    ));
    let publisher = Arc::new(Publisher::new(
        config.publish.output_path.as_ref().map(PathBuf::from),
    ));

    // Create app state
    let state = AppState {
        config: config.clone(),
        knowledge,
        orchestrator,
        publisher,
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

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Analysis endpoints
        .route("/analysis", post(handlers::analysis::submit))
        .route("/analysis/result", get(handlers::analysis::result));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
