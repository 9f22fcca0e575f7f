//! DAO Event Indexer — entry point.
//!
//! Hosts one governance [`Engine`] instance, starts a background task that
//! copies its event log into SQLite, and exposes an Axum REST API for the
//! front-end: governance calls go to the engine, event queries go to the
//! indexed copy.

mod api;
mod config;
mod db;
mod errors;
mod events;
mod indexer;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use dao_engine::{Engine, InMemorySettlement};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use indexer::IndexerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // Payouts settle in memory; a real settlement layer plugs in here.
    let settlement = Arc::new(InMemorySettlement::new());
    let engine = Arc::new(Engine::new(config.governance.clone(), settlement)?);

    // The engine starts with an empty log; drop rows indexed by earlier runs.
    db::reset_index(&pool).await?;

    let shutdown = CancellationToken::new();

    // ─── Background indexer ───────────────────────────────
    let indexer_state = Arc::new(IndexerState {
        pool: pool.clone(),
        config: config.clone(),
        engine: engine.clone(),
    });
    let indexer_task = tokio::spawn(indexer::run(indexer_state, shutdown.clone()));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState { pool, engine });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/contributions", post(api::contribute))
        .route("/members/:address", get(api::get_member))
        .route("/treasury", get(api::get_treasury))
        .route("/proposals", get(api::list_proposals).post(api::create_proposal))
        .route("/proposals/:id", get(api::get_proposal))
        .route(
            "/proposals/:id/votes",
            get(api::get_proposal_votes).post(api::perform_vote),
        )
        .route("/proposals/:id/finalize", post(api::finalize_proposal))
        .route("/proposals/:id/payout", post(api::pay_beneficiary))
        .route("/proposals/:id/events", get(api::get_proposal_events))
        .route("/events", get(api::get_all_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    indexer_task.await?;
    Ok(())
}
