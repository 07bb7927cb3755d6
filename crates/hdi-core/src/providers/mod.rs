//! Multi-provider LLM abstraction layer
//!
//! Supports Google Gemini, Groq and OpenAI. Adapters implement the
//! [`LlmProvider`] trait and are composed via [`ModelRouter`], which
//! substitutes an alternate provider when the nominal one is unconfigured.

pub mod credential;
pub mod google;
pub mod openai;
pub mod openai_compat;
pub mod router;
pub mod types;

pub use credential::{Credential, mask_secret};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ChatResult, ModelRouter, Selection};
pub use types::{
    ChatMessage, ChatMessageContent, ChatRole, ChatTurns, ContentPart, FailureReason, ImageUrl,
    LlmProvider, ProviderFailure, ProviderKind,
};
