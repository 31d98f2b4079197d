// src/server/mod.rs
// HTTP ingress. One endpoint receives inbound messages and runs a full turn;
// media payloads come back inline (audio as base64, images by path).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::TurnError;
use crate::graph::state::{CallInfo, ChatMessage, StatePatch};
use crate::graph::TurnRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub thread_id: String,
    /// Defaults to the thread id for single-user threads.
    pub user_id: Option<String>,
    pub phone_number: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub workflow: String,
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Base64-encoded audio bytes when the turn produced speech.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<CallInfo>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/message", post(handle_message))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn handle_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty"));
    }

    let turn = TurnRequest {
        user_id: req.user_id.clone().unwrap_or_else(|| req.thread_id.clone()),
        thread_id: req.thread_id,
        phone_number: req.phone_number,
    };

    let outcome = state
        .engine
        .invoke(StatePatch::append(ChatMessage::user(req.text)), &turn)
        .await?;

    Ok(Json(MessageResponse {
        workflow: outcome.workflow.as_str().to_string(),
        reply: outcome.last_reply().map(str::to_string),
        image_path: outcome.image_path.clone(),
        audio: outcome.audio.as_deref().map(|bytes| BASE64.encode(bytes)),
        call: outcome.call.clone(),
    }))
}

enum ApiError {
    BadRequest(&'static str),
    Turn(TurnError),
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        ApiError::Turn(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": msg })))
                    .into_response()
            }
            ApiError::Turn(err) => {
                error!(stage = err.stage(), error = %err, "turn failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({
                        "error": err.to_string(),
                        "reply": "Sorry, something went wrong on my end. Mind trying that again?",
                    })),
                )
                    .into_response()
            }
        }
    }
}
