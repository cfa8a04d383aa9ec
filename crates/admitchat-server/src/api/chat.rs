use admitchat_ai::Message;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::AppState;

/// Diagnostic body for failures before the stream opens.
pub const PROVIDER_ERROR_BODY: &str = "Error processing request";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

// POST /api/chat
pub async fn relay_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed chat request");
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid chat request: {}", rejection.body_text()),
            )
                .into_response();
        }
    };

    tracing::info!(messages = request.messages.len(), "Received chat request");

    match state.relay.open(request.messages).await {
        Ok(stream) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(stream),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "API error");
            (StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_ERROR_BODY).into_response()
        }
    }
}
