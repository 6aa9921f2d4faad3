//! Documentation of a crowdfunding campaign voting service.
//!
//! Investors register against a campaign, each funding stage gets a vote with its
//! own deadline, and investors cast yes/no ballots on it until the results say the
//! vote is over.
//!
//!
//!
//! # General Infrastructure
//! - Single axum server in front of Redis
//! - Redis holds every document as JSON, see [`database`]
//! - No auth, whoever knows an investor address can vote as that investor
//! - Each handler is a lookup then at most one atomic write
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Body / Query |
//! |---|---|---|
//! | POST | `/campaign` | `{address, name, stages}` |
//! | GET | `/{campaign}` | |
//! | GET | `/{campaign}/{stage}/check` | |
//! | POST | `/{campaign}/{stage}/check` | `{address}` |
//! | POST | `/{campaign}` | `{stage, powText}` |
//! | POST | `/{campaign}/registerInvestor` | `{investorAddress, name}` |
//! | POST | `/{campaign}/{stage}/vote` | `{yes, investorAddress}` |
//! | PUT | `/{campaign}/{stage}/vote` | `{yes, investorAddress}` |
//! | GET | `/{campaign}/{stage}/vote` | `?investorAddress=` |
//! | GET | `/{campaign}/{stage}/stats` | |
//! | GET | `/results/{campaign}/{stage}` | |
//!
//!
//!
//! # Notes
//!
//! ## Duplicates
//! Nothing is unique except investors. Creating a campaign or a stage vote twice stores
//! two documents and lookups keep returning the first. Casting twice stores two ballots,
//! both counted in the results. Changing a vote rewrites all of them.
//!
//! ## Results
//! Remaining time is `deadline - now` in milliseconds. Days and hours are floored, then
//! hours take `% 24`, so past deadlines show negative values such as `-1d -1h`.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! `````
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://localhost:6379 RUST_LOG=info cargo run
//! `````
//!
//! Drive a full voting round against it.
//! ```sh
//! cargo run -p tester -- http://localhost:1111
//! `````
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
pub mod tally;

use error::AppError;
use routes::{
    campaign_votes_handler, cast_vote_handler, change_vote_handler, check_vote_handler,
    check_voted_handler, create_campaign_handler, create_vote_handler, investor_vote_handler,
    register_investor_handler, results_handler, stats_handler,
};
use state::State;

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/campaign", post(create_campaign_handler))
        .route(
            "/{campaign_address}",
            get(campaign_votes_handler).post(create_vote_handler),
        )
        .route(
            "/{campaign_address}/registerInvestor",
            post(register_investor_handler),
        )
        .route(
            "/{campaign_address}/{stage}/check",
            get(check_vote_handler).post(check_voted_handler),
        )
        .route(
            "/{campaign_address}/{stage}/vote",
            get(investor_vote_handler)
                .post(cast_vote_handler)
                .put(change_vote_handler),
        )
        .route("/{campaign_address}/{stage}/stats", get(stats_handler))
        .route("/results/{campaign_address}/{stage}", get(results_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = app(state);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
}
