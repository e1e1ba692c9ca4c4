//! Session endpoints
//!
//! Thin JSON wrappers over [`Coordinator`](crate::coordinator::Coordinator)
//! operations. Member identity travels in the body for writes and in the
//! `member_id` query parameter for reads and deletes.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wkune_common::uuid_utils::{generate_member_id, normalize_session_code};
use wkune_common::Error;

use crate::api::error::{ApiError, ApiResult};
use crate::membership::JoinOutcome;
use crate::readiness::ReadyOutcome;
use crate::restart::RestartVoteStatus;
use crate::state::SessionState;
use crate::AppState;

/// Body naming the acting member
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub member_id: String,
}

/// Query naming the acting member
#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub member_id: String,
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptedRequest {
    pub member_id: String,
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub member_id: String,
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct RollNextRequest {
    pub member_id: String,
    /// Item to exclude; defaults to the stored result
    #[serde(default)]
    pub current_item: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberIdResponse {
    pub member_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub item: Option<String>,
}

/// POST /members
pub async fn new_member() -> Json<MemberIdResponse> {
    Json(MemberIdResponse {
        member_id: generate_member_id(),
    })
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionCreatedResponse>)> {
    let code = state.coordinator.create_session(&req.creator_id).await?;
    Ok((StatusCode::CREATED, Json(SessionCreatedResponse { code })))
}

/// DELETE /sessions/:code?member_id=
pub async fn delete_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<MemberQuery>,
) -> ApiResult<StatusCode> {
    require_creator(&state, &code, &query.member_id, "delete the session").await?;
    state.coordinator.delete_session(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/:code/join
pub async fn join(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<JoinOutcome>> {
    Ok(Json(state.coordinator.join(&code, &req.member_id).await?))
}

/// POST /sessions/:code/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<StatusCode> {
    state.coordinator.leave(&code, &req.member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/:code/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<StatusCode> {
    state.coordinator.heartbeat(&code, &req.member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/:code/state?member_id=
pub async fn session_state(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<MemberQuery>,
) -> ApiResult<Json<SessionState>> {
    Ok(Json(
        state.coordinator.session_state(&code, &query.member_id).await?,
    ))
}

/// POST /sessions/:code/items
pub async fn add_item(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<Json<ItemsResponse>> {
    let items = state
        .coordinator
        .add_item(&code, &req.member_id, &req.item)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

/// DELETE /sessions/:code/items/:index?member_id=
pub async fn remove_item(
    State(state): State<AppState>,
    Path((code, index)): Path<(String, usize)>,
    Query(query): Query<MemberQuery>,
) -> ApiResult<Json<ItemsResponse>> {
    let items = state
        .coordinator
        .remove_item(&code, &query.member_id, index)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

/// GET /sessions/:code/acceptance?member_id=
pub async fn items_for_acceptance(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<MemberQuery>,
) -> ApiResult<Json<ItemsResponse>> {
    let items = state
        .coordinator
        .items_for_acceptance(&code, &query.member_id)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

/// PUT /sessions/:code/accepted
pub async fn set_accepted_items(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<AcceptedRequest>,
) -> ApiResult<Json<ItemsResponse>> {
    state
        .coordinator
        .set_accepted_items(&code, &req.member_id, &req.items)
        .await?;
    Ok(Json(ItemsResponse { items: req.items }))
}

/// POST /sessions/:code/ready
pub async fn set_ready(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<ReadyRequest>,
) -> ApiResult<Json<ReadyOutcome>> {
    Ok(Json(
        state
            .coordinator
            .set_ready(&code, &req.member_id, req.ready)
            .await?,
    ))
}

/// POST /sessions/:code/reroll
pub async fn reroll(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<SelectionResponse>> {
    require_creator(&state, &code, &req.member_id, "reroll").await?;
    let item = state.coordinator.reroll(&code).await?;
    Ok(Json(SelectionResponse { item }))
}

/// POST /sessions/:code/roll-next
pub async fn roll_next(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<RollNextRequest>,
) -> ApiResult<Json<SelectionResponse>> {
    require_creator(&state, &code, &req.member_id, "roll the next item").await?;
    let item = state
        .coordinator
        .roll_next(&code, req.current_item.as_deref())
        .await?;
    Ok(Json(SelectionResponse { item }))
}

/// POST /sessions/:code/restart-votes
pub async fn vote_restart(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<Json<RestartVoteStatus>> {
    Ok(Json(
        state.coordinator.vote_restart(&code, &req.member_id).await?,
    ))
}

/// GET /sessions/:code/export
pub async fn export_items(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let text = state.coordinator.export_items(&code).await?;
    let disposition = format!(
        "attachment; filename=\"wkune-{}.txt\"",
        normalize_session_code(&code)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    ))
}

async fn require_creator(
    state: &AppState,
    code: &str,
    member_id: &str,
    action: &'static str,
) -> ApiResult<()> {
    if member_id.trim().is_empty() {
        return Err(ApiError::BadRequest("member_id is required".to_string()));
    }
    if !state.coordinator.is_creator(code, member_id).await? {
        debug!("Member {} tried to {} in {}", member_id, action, code);
        return Err(Error::NotCreator(action).into());
    }
    Ok(())
}
