use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Missing document: {0}")]
    Missing(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Investor not registered")]
    InvestorNotRegistered,

    #[error("Vote not created")]
    VoteNotCreated,

    #[error("Investor has not voted yet")]
    NotVotedYet,

    #[error("Invalid Investor Address")]
    InvalidInvestorAddress,

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Internal error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, body) = match self {
            // Registration failures carry `error`, every other absence carries `message`.
            AppError::InvestorNotRegistered => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": message }),
            ),
            AppError::VoteNotCreated
            | AppError::NotVotedYet
            | AppError::InvalidInvestorAddress => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": message }),
            ),
            AppError::InvalidStage { .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            AppError::Store { .. } | AppError::Config { .. } | AppError::Io { .. } => {
                error!("{message}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": message }),
                )
            }
        };

        if status.is_client_error() {
            warn!("{message}");
        }

        (status, Json(body)).into_response()
    }
}
