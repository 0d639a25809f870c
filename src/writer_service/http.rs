// src/writer_service/http.rs
// Route table and handlers for the WriterService HTTP API (spec §6).
// Grounded on backend/src/api/http/mod.rs's Router<Arc<AppState>> wiring
// and backend/src/api/http/health.rs's handler shape.

use std::sync::Arc;

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identity::{AgentKey, Discoverable, DmPolicy, IdentityModel};
use crate::membership::{AccessType, Channel, ChannelId, MembershipModel};
use crate::messaging::{notes_match, Message, Messaging, SearchQuery};

use super::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/messages", get(get_messages).post(post_message))
        .route("/api/search", post(search_messages))
        .route("/api/channels", get(list_channels).post(post_channel))
        .route("/api/channels/{id}/join", post(join_channel))
        .route("/api/channels/{id}/leave", post(leave_channel))
        .route("/api/channels/{id}/invite", post(invite_to_channel))
        .route("/api/agents", get(list_agents).post(post_agent))
        .route("/api/notes", get(get_notes).post(post_note))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(state.store.reader_conn()).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"ok": false, "error": e.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct PostMessageBody {
    channel_id: String,
    content: String,
    sender_id: String,
    sender_project_id: Option<String>,
    metadata: Option<serde_json::Value>,
    thread_id: Option<i64>,
}

#[derive(Serialize)]
struct IdResponse {
    ok: bool,
    id: i64,
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostMessageBody>,
) -> Result<Json<IdResponse>, DomainError> {
    let messaging = Messaging::new(&state.store);
    let sender = AgentKey::new(body.sender_id, body.sender_project_id);
    let id = messaging
        .post(
            &body.channel_id,
            &sender,
            &body.content,
            body.metadata,
            body.thread_id,
            state.config.settings.max_message_length,
        )
        .await?;
    Ok(Json(IdResponse { ok: true, id }))
}

#[derive(Deserialize)]
struct GetMessagesParams {
    channel_id: String,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    since: Option<i64>,
    before: Option<i64>,
    caller_name: String,
    caller_project_id: Option<String>,
}

fn default_limit() -> i64 {
    50
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetMessagesParams>,
) -> Result<Json<Vec<Message>>, DomainError> {
    let messaging = Messaging::new(&state.store);
    let caller = AgentKey::new(params.caller_name, params.caller_project_id);
    let messages = messaging
        .fetch(&params.channel_id, &caller, params.limit, params.offset, params.since, params.before)
        .await?;
    Ok(Json(messages))
}

#[derive(Deserialize)]
struct SearchBody {
    query: Option<String>,
    channel_ids: Option<Vec<String>>,
    project_ids: Option<Vec<String>>,
    metadata_filters: Option<serde_json::Value>,
    #[serde(default = "default_ranking_profile")]
    ranking_profile: String,
    #[serde(default = "default_limit_usize")]
    limit: usize,
    caller_name: String,
    caller_project_id: Option<String>,
}

fn default_ranking_profile() -> String {
    "default".to_string()
}

fn default_limit_usize() -> usize {
    50
}

async fn search_messages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Vec<serde_json::Value>>, DomainError> {
    let messaging = Messaging::new(&state.store);
    let caller = AgentKey::new(body.caller_name, body.caller_project_id);
    let query = SearchQuery {
        text: body.query,
        channel_ids: body.channel_ids,
        project_ids: body.project_ids,
        metadata_filters: body.metadata_filters,
        ranking_profile: body.ranking_profile,
        limit: body.limit,
    };
    let results = messaging.search(&caller, &query, state.ranker.as_ref()).await?;
    let json: Vec<serde_json::Value> = results
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "message": r.message,
                "final_score": r.final_score,
                "sub_scores": r.sub_scores,
            })
        })
        .collect();
    Ok(Json(json))
}

#[derive(Deserialize)]
struct ListChannelsParams {
    agent_name: Option<String>,
    agent_project_id: Option<String>,
    project_id: Option<String>,
    #[serde(default)]
    include_archived: bool,
    is_default: Option<bool>,
}

async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListChannelsParams>,
) -> Result<Json<Vec<Channel>>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let agent = params.agent_name.map(|name| AgentKey::new(name, params.agent_project_id));
    let channels = membership
        .list_channels(
            agent.as_ref(),
            params.project_id.as_deref(),
            params.include_archived,
            params.is_default,
        )
        .await?;
    Ok(Json(channels))
}

#[derive(Deserialize)]
struct PostChannelBody {
    name: String,
    description: Option<String>,
    scope: String,
    project_id: Option<String>,
    created_by: String,
    is_default: bool,
}

#[derive(Serialize)]
struct ChannelIdResponse {
    ok: bool,
    channel_id: String,
}

async fn post_channel(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostChannelBody>,
) -> Result<Json<ChannelIdResponse>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let id = match (body.scope.as_str(), &body.project_id) {
        ("project", Some(pid)) => ChannelId::project(pid.clone(), body.name.clone()),
        _ => ChannelId::global(body.name.clone()),
    };
    let channel_id = membership
        .create_channel(
            &id,
            AccessType::Open,
            body.project_id.as_deref(),
            &body.name,
            body.description.as_deref(),
            &body.created_by,
            body.is_default,
        )
        .await?;
    Ok(Json(ChannelIdResponse { ok: true, channel_id }))
}

#[derive(Deserialize)]
struct MemberBody {
    agent_name: String,
    agent_project_id: Option<String>,
}

#[derive(Serialize)]
struct SuccessResponse {
    ok: bool,
    success: bool,
}

async fn join_channel(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<MemberBody>,
) -> Result<Json<SuccessResponse>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let agent = AgentKey::new(body.agent_name, body.agent_project_id);
    membership.join_channel(&id, &agent).await?;
    Ok(Json(SuccessResponse { ok: true, success: true }))
}

async fn leave_channel(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<MemberBody>,
) -> Result<Json<SuccessResponse>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let agent = AgentKey::new(body.agent_name, body.agent_project_id);
    membership.leave_channel(&id, &agent).await?;
    Ok(Json(SuccessResponse { ok: true, success: true }))
}

#[derive(Deserialize)]
struct InviteBody {
    invitee_name: String,
    invitee_project_id: Option<String>,
    inviter_name: String,
    inviter_project_id: Option<String>,
}

async fn invite_to_channel(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<InviteBody>,
) -> Result<Json<SuccessResponse>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let inviter = AgentKey::new(body.inviter_name, body.inviter_project_id);
    let invitee = AgentKey::new(body.invitee_name, body.invitee_project_id);
    membership.invite_to_channel(&id, &inviter, &invitee).await?;
    Ok(Json(SuccessResponse { ok: true, success: true }))
}

#[derive(Deserialize)]
struct ListAgentsParams {
    caller_name: String,
    caller_project_id: Option<String>,
}

async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAgentsParams>,
) -> Result<Json<Vec<crate::identity::Agent>>, DomainError> {
    let identity = IdentityModel::new(&state.store);
    let caller = AgentKey::new(params.caller_name, params.caller_project_id);
    let agents = identity.list_agents(&caller).await?;
    Ok(Json(agents))
}

#[derive(Deserialize)]
struct PostAgentBody {
    name: String,
    project_id: Option<String>,
    description: Option<String>,
    #[serde(default = "default_dm_policy")]
    dm_policy: String,
    #[serde(default = "default_discoverable")]
    discoverable: String,
}

fn default_dm_policy() -> String {
    "open".to_string()
}

fn default_discoverable() -> String {
    "public".to_string()
}

async fn post_agent(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostAgentBody>,
) -> Result<Json<SuccessResponse>, DomainError> {
    let identity = IdentityModel::new(&state.store);
    identity
        .register_agent(
            &body.name,
            body.project_id.as_deref(),
            body.description.as_deref(),
            DmPolicy::parse(&body.dm_policy),
            Discoverable::parse(&body.discoverable),
        )
        .await?;
    Ok(Json(SuccessResponse { ok: true, success: true }))
}

#[derive(Deserialize)]
struct PostNoteBody {
    content: String,
    agent_name: String,
    agent_project_id: Option<String>,
    metadata: Option<serde_json::Value>,
    session_context: Option<serde_json::Value>,
    tags: Option<Vec<String>>,
}

#[derive(Serialize)]
struct NoteIdResponse {
    ok: bool,
    note_id: i64,
}

async fn post_note(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostNoteBody>,
) -> Result<Json<NoteIdResponse>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let agent = AgentKey::new(body.agent_name, body.agent_project_id);
    let channel_id = membership.ensure_notes_channel(&agent).await?;

    let mut metadata = body.metadata.unwrap_or_else(|| serde_json::json!({}));
    if let Some(obj) = metadata.as_object_mut() {
        if let Some(session_context) = body.session_context {
            obj.insert("session_context".to_string(), session_context);
        }
        if let Some(tags) = body.tags {
            obj.insert("notes".to_string(), serde_json::json!({ "tags": tags }));
        }
    }

    let messaging = Messaging::new(&state.store);
    let note_id = messaging
        .post(
            &channel_id,
            &agent,
            &body.content,
            Some(metadata),
            None,
            state.config.settings.max_message_length,
        )
        .await?;
    Ok(Json(NoteIdResponse { ok: true, note_id }))
}

#[derive(Deserialize)]
struct GetNotesParams {
    agent_name: String,
    agent_project_id: Option<String>,
    query: Option<String>,
    /// Comma-separated tag list (query-string params don't carry arrays).
    tags: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

async fn get_notes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetNotesParams>,
) -> Result<Json<Vec<Message>>, DomainError> {
    let membership = MembershipModel::new(&state.store);
    let agent = AgentKey::new(params.agent_name, params.agent_project_id);
    let channel_id = membership.ensure_notes_channel(&agent).await?;

    let messaging = Messaging::new(&state.store);
    let notes = messaging
        .fetch(&channel_id, &agent, params.limit, 0, None, None)
        .await?;

    let tags: Option<Vec<String>> = params.tags.map(|raw| {
        raw.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    });
    let filtered = notes
        .into_iter()
        .filter(|m| notes_match(m, params.query.as_deref(), tags.as_deref()))
        .collect::<Vec<_>>();
    Ok(Json(filtered))
}
