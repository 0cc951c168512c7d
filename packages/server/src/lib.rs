#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the forest watch region insight pipeline.
//!
//! Holds one session's [`RegionStore`] in application state. Drawn
//! polygons are analyzed by the statistics service as they are added,
//! and `POST /api/insights` sends every stored region to the generative
//! model in one batch. The stateless `POST /generate-insights` proxy
//! takes region descriptions from the caller instead.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use forest_watch_ai::batcher::InsightBatcher;
use forest_watch_ai::providers::{LlmProvider, create_provider_from_env};
use forest_watch_analysis::{AnalysisError, StatisticsClient};
use forest_watch_overlay::Calibration;
use forest_watch_region::RegionStore;
use thiserror::Error;

use crate::config::AppConfig;

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The LLM provider could not be created.
    #[error(transparent)]
    Ai(#[from] forest_watch_ai::AiError),

    /// The statistics client could not be built.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Shared application state.
pub struct AppState {
    /// Regions of the current session.
    pub store: RegionStore,
    /// Statistics service client.
    pub statistics: StatisticsClient,
    /// Sends insight batches to the model.
    pub batcher: InsightBatcher,
    /// Conversion factors for overlays and summaries.
    pub calibration: Calibration,
    /// Held while an insight batch is in flight.
    pub batch_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Builds state with an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Analysis`] if the HTTP client cannot be
    /// built.
    pub fn new(config: AppConfig, batcher: InsightBatcher) -> Result<Self, ServerError> {
        Ok(Self {
            store: RegionStore::new(),
            statistics: StatisticsClient::new(config.statistics)?,
            batcher,
            calibration: config.calibration,
            batch_lock: tokio::sync::Mutex::new(()),
        })
    }
}

/// Registers every route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/generate-insights",
        web::post().to(handlers::generate_insights),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/regions", web::get().to(handlers::list_regions))
            .route("/regions", web::post().to(handlers::add_region))
            .route("/regions", web::delete().to(handlers::clear_regions))
            .route("/regions/{id}", web::delete().to(handlers::remove_region))
            .route("/insights", web::post().to(handlers::insights))
            .route("/summary", web::get().to(handlers::summary)),
    );
}

/// Builds application state from the environment.
///
/// # Errors
///
/// Returns [`ServerError`] if the configuration file is unusable or no
/// LLM provider is configured.
pub async fn state_from_env() -> Result<AppState, ServerError> {
    let config = AppConfig::from_env()?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider_from_env().await?);
    log::info!("Using AI provider: {}", provider.name());
    log::info!("Statistics service: {}", config.statistics.base_url);

    let batcher = InsightBatcher::new(provider).with_timeout(config::ai_timeout_from_env());
    AppState::new(config, batcher)
}

/// Starts the forest watch API server.
///
/// Loads configuration, creates the LLM provider from the environment
/// and starts the Actix-Web HTTP server. This is a regular async
/// function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration or provider
/// is unusable, or if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let state = web::Data::new(state_from_env().await.map_err(|e| {
        log::error!("Failed to start: {e}");
        std::io::Error::other(e)
    })?);

    let (bind_addr, port) = config::bind_from_env();

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
