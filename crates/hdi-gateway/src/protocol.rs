//! Request bodies and the JSON error shape of the HTTP API

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hdi_core::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::error;

fn default_chat_model() -> String {
    "hdi-4".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_video_model() -> String {
    "sora".to_string()
}

/// `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_chat_model")]
    pub model: String,
}

/// `POST /api/generate/image`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenRequest {
    pub prompt: String,
    #[serde(default = "default_image_model")]
    pub model: String,
}

/// `POST /api/generate/video`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenRequest {
    pub prompt: String,
    #[serde(default = "default_video_model")]
    pub model: String,
}

/// `POST /api/generate/pptx`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PptxRequest {
    pub topic: String,
}

/// Result of `POST /api/documents/parse`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub filename: String,
    pub content: String,
    pub length: usize,
}

/// Error body `{"detail": ...}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<hdi_knowledge::StoreError> for ApiError {
    fn from(e: hdi_knowledge::StoreError) -> Self {
        error!("Conversation store error: {}", e);
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}
