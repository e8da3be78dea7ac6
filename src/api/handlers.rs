use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::agent::{self, Agent};
use crate::data_models::SearchRequest;
use crate::errors::FetchError;
use crate::finder::SceneFinder;

use super::models::{ChatRequest, ChatResponse, DownloadResponse};

pub struct AppState {
    pub finder: SceneFinder,
    /// None when no OPENAI_API_KEY is configured; the direct download
    /// endpoint still works.
    pub agent: Option<Agent>,
}

pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<DownloadResponse>, (StatusCode, String)> {
    let result = state
        .finder
        .find_and_download(&request)
        .await
        .map_err(|e| {
            let code = match &e {
                FetchError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
                FetchError::NoScenesFound { .. } => StatusCode::NOT_FOUND,
                FetchError::SearchFailed(_) => StatusCode::BAD_GATEWAY,
            };
            (code, agent::describe_error(&e))
        })?;

    let summary = agent::summarize(&result);
    Ok(Json(DownloadResponse { result, summary }))
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let Some(agent) = &state.agent else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Chat is disabled: OPENAI_API_KEY is not set".to_string(),
        ));
    };

    if request.messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Message history cannot be empty".to_string(),
        ));
    }

    let mut messages = request.messages;
    if messages.first().map(|m| m.role != "system").unwrap_or(true) {
        messages.insert(0, agent::system_message());
    }

    let reply = agent.respond(&mut messages).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Agent error: {e:#}"),
        )
    })?;

    Ok(Json(ChatResponse {
        reply: reply.reply,
        tool_summary: reply.tool_summary,
        messages,
    }))
}
