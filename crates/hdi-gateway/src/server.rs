//! Gateway HTTP server: Axum router over the chat, media and data services

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Json;
use hdi_core::presentation::{self, PresentationResult};
use hdi_core::{ChatReply, ChatService};
use hdi_knowledge::{ConversationStore, ReferenceData};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::protocol::{ChatRequest, ImageGenRequest, PptxRequest, VideoGenRequest};
use crate::{conversations, documents, reference};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state for all handlers
#[derive(Clone)]
pub struct GatewayState {
    pub chat: Arc<ChatService>,
    pub reference: Arc<ReferenceData>,
    pub conversations: Arc<dyn ConversationStore>,
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(
        chat: Arc<ChatService>,
        reference: Arc<ReferenceData>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            chat,
            reference,
            conversations,
            start_time: std::time::Instant::now(),
        }
    }
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, state: GatewayState) -> Self {
        Self { state, bind }
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Serve forever
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/models", get(models_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/generate/image", post(image_handler))
        .route("/api/generate/video", post(video_handler))
        .route("/api/generate/pptx", post(pptx_handler))
        .route(
            "/api/documents/parse",
            post(documents::parse_handler).layer(DefaultBodyLimit::max(documents::MAX_UPLOAD_BYTES)),
        )
        .route("/api/rnd/all", get(reference::all_handler))
        .route("/api/rnd/papers", get(reference::papers_handler))
        .route("/api/rnd/equipment", get(reference::equipment_handler))
        .route("/api/rnd/materials", get(reference::materials_handler))
        .route("/api/rnd/institutions", get(reference::institutions_handler))
        .route("/api/prompts/master", get(reference::master_prompts_handler))
        .route(
            "/api/conversations",
            get(conversations::list_handler).post(conversations::save_handler),
        )
        .route(
            "/api/conversations/{id}",
            delete(conversations::delete_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── HTTP Handlers ──

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "ChatHDI API - Ready",
        "version": API_VERSION,
    }))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let router = state.chat.router();
    let providers: serde_json::Map<String, serde_json::Value> = router
        .availability()
        .iter()
        .map(|(kind, up)| (kind.as_str().to_string(), serde_json::Value::Bool(*up)))
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "version": API_VERSION,
        "providers": providers,
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn models_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let router = state.chat.router();
    let registry = router.registry();
    let models: Vec<serde_json::Value> = registry
        .iter()
        .map(|(id, binding)| {
            serde_json::json!({
                "id": id,
                "provider": binding.provider,
                "model": binding.model,
                "description": binding.description,
                "available": router.is_available(binding.provider),
            })
        })
        .collect();

    Json(serde_json::json!({
        "models": models,
        "default": registry.default_binding(),
    }))
}

async fn chat_handler(
    State(state): State<GatewayState>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatReply> {
    debug!("Chat request: {} messages, model {}", req.messages.len(), req.model);
    Json(state.chat.handle(&req.messages, &req.model).await)
}

async fn image_handler(
    State(state): State<GatewayState>,
    Json(req): Json<ImageGenRequest>,
) -> impl IntoResponse {
    Json(state.chat.media().generate_image(&req.prompt, &req.model).await)
}

async fn video_handler(
    State(state): State<GatewayState>,
    Json(req): Json<VideoGenRequest>,
) -> impl IntoResponse {
    Json(state.chat.media().generate_video(&req.prompt, &req.model).await)
}

async fn pptx_handler(
    State(state): State<GatewayState>,
    Json(req): Json<PptxRequest>,
) -> Json<PresentationResult> {
    Json(presentation::generate_from_topic(state.chat.router(), &req.topic).await)
}
