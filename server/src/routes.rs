use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
#[cfg(feature = "verbose")]
use tracing::info;

use crate::{
    error::AppError,
    models::{
        BallotRequest, InvestorQuery, NewCampaign, NewInvestor, NewVote, VotedRequest,
        parse_stage, parse_stage_value,
    },
    state::State as AppState,
};

type Shared = State<Arc<AppState>>;

fn stage_from_path(stage: &str) -> Result<i64, AppError> {
    parse_stage(stage).ok_or_else(|| AppError::InvalidStage(stage.to_string()))
}

pub async fn create_campaign_handler(
    State(state): Shared,
    Json(payload): Json<NewCampaign>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = state.voting.create_campaign(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "campaign": campaign })),
    ))
}

pub async fn campaign_votes_handler(
    State(state): Shared,
    Path(campaign_address): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let vote = state.voting.votes_for_campaign(&campaign_address).await?;

    Ok((StatusCode::OK, Json(vote)))
}

pub async fn check_vote_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    let is_valid = state.voting.vote_exists(&campaign_address, stage).await?;

    Ok((StatusCode::OK, Json(json!({ "isValid": is_valid }))))
}

pub async fn check_voted_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
    payload: Option<Json<VotedRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;
    let address = payload.and_then(|Json(payload)| payload.address);

    let voted = state
        .voting
        .investor_voted(&campaign_address, stage, address.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "voted": voted.voted, "vote": voted.vote })),
    ))
}

pub async fn create_vote_handler(
    State(state): Shared,
    Path(campaign_address): Path<String>,
    Json(payload): Json<NewVote>,
) -> Result<impl IntoResponse, AppError> {
    let stage = parse_stage_value(&payload.stage)
        .ok_or_else(|| AppError::InvalidStage(payload.stage.to_string()))?;

    state
        .voting
        .create_vote(&campaign_address, stage, payload.pow_text)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

pub async fn register_investor_handler(
    State(state): Shared,
    Path(campaign_address): Path<String>,
    Json(payload): Json<NewInvestor>,
) -> Result<impl IntoResponse, AppError> {
    let _investor = state
        .voting
        .register_investor(&campaign_address, &payload.investor_address, payload.name)
        .await?;

    #[cfg(feature = "verbose")]
    info!("Investor now in: {:?}", _investor.invested_in);

    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

pub async fn cast_vote_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
    Json(payload): Json<BallotRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    state
        .voting
        .cast_vote(&campaign_address, stage, &payload.investor_address, payload.yes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Voted successfully" })),
    ))
}

pub async fn change_vote_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
    Json(payload): Json<BallotRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    state
        .voting
        .change_vote(&campaign_address, stage, &payload.investor_address, payload.yes)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Vote changed successfully" })),
    ))
}

pub async fn investor_vote_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
    Query(query): Query<InvestorQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    let ballot = state
        .voting
        .investor_vote(&campaign_address, stage, query.investor_address.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "vote": ballot })),
    ))
}

pub async fn stats_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    let vote = state.voting.stage_stats(&campaign_address, stage).await?;

    #[cfg(feature = "verbose")]
    info!("Stats for {campaign_address} stage {stage}: {} ballots", vote.votes.len());

    Ok((StatusCode::OK, Json(json!({ "success": true, "vote": vote }))))
}

pub async fn results_handler(
    State(state): Shared,
    Path((campaign_address, stage)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stage = stage_from_path(&stage)?;

    let results = state.voting.results(&campaign_address, stage).await?;

    Ok((StatusCode::OK, Json(results)))
}
