use std::{path::Path, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path as UrlPath, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use relay_core::{ChatError, ErrorKind, RawMessage};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error, warn};

use crate::proxy::{ChatProxy, ChatRequest};
use crate::sse::sse_response;

pub type AppState = Arc<ChatProxy>;

pub fn router(proxy: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/chat/{provider}", post(chat))
        .with_state(proxy);
    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };
    app.layer(cors).layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

// GET /api/health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    messages: Option<Vec<RawMessage>>,
    provider: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

// POST /api/chat/{provider}
pub async fn chat(
    State(proxy): State<AppState>,
    UrlPath(provider): UrlPath<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: ChatBody = serde_json::from_slice(&body).map_err(|e| {
        ApiError(ChatError::InvalidInput(format!("invalid request body: {e}")))
    })?;
    if let Some(named) = body.provider.as_deref() {
        if !named.eq_ignore_ascii_case(&provider) {
            warn!(target:"server::api","body provider '{}' ignored in favour of path '{}'", named, provider);
        }
    }
    let messages = body
        .messages
        .ok_or_else(|| ApiError(ChatError::InvalidInput("messages must be an array".into())))?;

    let events = proxy
        .open(
            &provider,
            ChatRequest {
                messages,
                max_tokens: body.max_tokens,
                temperature: body.temperature,
            },
        )
        .await?;
    Ok(sse_response(events))
}

/// Failures discovered before the event stream starts.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = self.0.to_string();
        match self.0.kind() {
            ErrorKind::InvalidInput | ErrorKind::UnknownProvider => {
                warn!(target:"server::api","rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": msg }))).into_response()
            }
            ErrorKind::Overloaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            // Cancellation only happens once a stream is live, and then nobody
            // is left to read a response.
            ErrorKind::ClientDisconnected => {
                debug!(target:"server::api","request canceled before streaming: {}", msg);
                StatusCode::NO_CONTENT.into_response()
            }
            ErrorKind::UpstreamUnavailable | ErrorKind::Timeout => {
                error!(target:"server::api","upstream request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "API request failed", "message": msg })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_per_error_kind() {
        let status = |e: ChatError| ApiError(e).into_response().status();
        assert_eq!(status(ChatError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ChatError::UnknownProvider("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ChatError::Overloaded("x".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(ChatError::Timeout("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(ChatError::RateLimit("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn cancellation_is_not_reported_as_a_failure() {
        let resp = ApiError(ChatError::Canceled).into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
