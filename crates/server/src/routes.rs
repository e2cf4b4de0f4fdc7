use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    aggregate,
    config::Config,
    error::AppError,
    fingerprint::VoterSignals,
    models::*,
    store::PollStore,
    validation::{ValidationErrors, create_poll_from_json, vote_from_json},
};

// ===== App State =====

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/polls", post(create_poll))
        .route("/polls/:id", get(get_poll))
        .route("/polls/:id/options", get(get_options))
        .route("/polls/:id/results", get(get_results))
        .route("/polls/:id/complete", get(get_complete))
        .route("/polls/:id/vote", post(submit_vote))
        .route("/polls/:id/vote/complete", get(get_vote_complete))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ===== Handlers =====

async fn root() -> &'static str {
    "QuickPoll backend - Use /health to check status"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => Json(serde_json::json!({
            "status": "ok",
            "database": "connected"
        })),
        Err(_) => Json(serde_json::json!({
            "status": "error",
            "database": "disconnected"
        })),
    }
}

async fn get_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PollDetail>, AppError> {
    Ok(Json(load_poll(&state, &id).await?))
}

async fn get_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PollOption>>, AppError> {
    // Unknown or malformed ids simply have no options.
    let Ok(id) = Uuid::parse_str(&id) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(state.store.get_options(id).await?))
}

async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PollResultsResponse>, AppError> {
    let poll = load_poll(&state, &id).await?;
    let summary = aggregate::summarize(&poll, Utc::now());

    Ok(Json(PollResultsResponse {
        poll,
        total_votes: summary.total_votes,
        last_vote_label: summary.last_vote_label,
        remaining_label: summary.remaining.label,
        is_expired: summary.remaining.is_expired,
        results: summary.tallies,
    }))
}

async fn get_complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PollCompleteResponse>, AppError> {
    let poll = load_poll(&state, &id).await?;
    let share_url = format!("{}/polls/{}", state.config.public_base_url, poll.poll.id);

    Ok(Json(PollCompleteResponse { poll, share_url }))
}

async fn get_vote_complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<VoteCompleteQuery>,
) -> Result<Json<VoteCompleteResponse>, AppError> {
    let poll = load_poll(&state, &id).await?;
    let now = Utc::now();
    let latest = aggregate::latest_vote(&poll.votes);
    let last_vote_label = aggregate::last_vote_label(latest, now);

    Ok(Json(VoteCompleteResponse {
        total_votes: poll.votes.len(),
        poll,
        voter_identifier: query.voter_identifier,
        last_vote_label,
    }))
}

async fn create_poll(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePollResponse>), AppError> {
    let Json(body) = payload.map_err(malformed_body)?;
    let new_poll = create_poll_from_json(body)?;

    let poll_id = state.store.create_poll_with_options(new_poll).await?;
    tracing::info!(%poll_id, "poll created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePollResponse {
            message: "Poll created.".to_string(),
            poll_id,
        }),
    ))
}

async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<VoteResponse>), AppError> {
    let poll_id = parse_poll_id(&id)?;
    let Json(body) = payload.map_err(malformed_body)?;
    let option_id = vote_from_json(body)?;

    let signals = VoterSignals::from_headers(&headers, peer.map(|ConnectInfo(addr)| addr.ip()));
    let voter_identifier = signals.fingerprint(Utc::now());

    state
        .store
        .record_vote(poll_id, option_id, &voter_identifier)
        .await?;
    tracing::info!(%poll_id, option_id, "vote recorded");

    Ok((
        StatusCode::CREATED,
        Json(VoteResponse {
            message: "Vote recorded.".to_string(),
            vote_complete_url: format!(
                "/polls/{poll_id}/vote/complete?voterIdentifier={voter_identifier}"
            ),
            voter_identifier,
        }),
    ))
}

// ===== Helpers =====

fn parse_poll_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound)
}

async fn load_poll(state: &AppState, id: &str) -> Result<PollDetail, AppError> {
    let id = parse_poll_id(id)?;
    state.store.get_poll(id).await?.ok_or(AppError::NotFound)
}

fn malformed_body(rejection: JsonRejection) -> AppError {
    AppError::Validation(ValidationErrors::single("body", rejection.body_text()))
}
