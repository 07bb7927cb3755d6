//! hdi-core - provider routing and chat orchestration for ChatHDI
//!
//! This crate provides:
//! - Provider adapters for Gemini, Groq and OpenAI behind one trait
//! - Model registry mapping public model ids to provider bindings
//! - Router that substitutes a configured provider when the nominal one is not
//! - Media intent detection with engineering prompt templates
//! - Image generation clients, document parsing and .pptx generation

pub mod chat;
pub mod context;
pub mod documents;
pub mod media;
pub mod presentation;
pub mod providers;
pub mod registry;

// Re-export main types for convenience
pub use chat::{ChatReply, ChatService};
pub use context::{SYSTEM_PROMPT, load_system_prompt};
pub use documents::parse_document;
pub use media::{MediaIntent, MediaKind, MediaService};
pub use presentation::{PresentationResult, generate_from_topic};
pub use providers::{
    ChatMessage, ChatResult, Credential, FailureReason, LlmProvider, ModelRouter, ProviderFailure,
    ProviderKind,
};
pub use registry::{ModelRegistry, ProviderBinding, RegistryError};
