//! Provider-agnostic types shared by every adapter and the router

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream vendor behind a model binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Groq,
    OpenAi,
}

impl ProviderKind {
    /// Every provider kind, in declaration order
    pub const ALL: [ProviderKind; 3] = [Self::Gemini, Self::Groq, Self::OpenAi];

    /// Stable lowercase identifier (matches the serde form)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    /// Name shown to end users in error text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini (Google)",
            Self::Groq => "Groq",
            Self::OpenAi => "OpenAI",
        }
    }

    /// Environment variable the deployment reads this provider's key from
    pub fn key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Concrete model used when this provider stands in for another one
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    /// Alternates to try, in order, when this provider is unavailable
    pub fn fallback_order(&self) -> &'static [ProviderKind] {
        match self {
            Self::Gemini => &[Self::Groq, Self::OpenAi],
            Self::Groq => &[Self::Gemini, Self::OpenAi],
            Self::OpenAi => &[Self::Gemini, Self::Groq],
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "groq" | "grok" => Some(Self::Groq),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Provider-agnostic chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: ChatMessageContent,
}

/// Content of a chat message: either plain text or multimodal parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single part of a multimodal message, in the OpenAI `type`-tagged shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    /// Text of the message; text parts are joined with newlines, images skipped
    pub fn text(&self) -> String {
        match &self.content {
            ChatMessageContent::Text(t) => t.clone(),
            ChatMessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A conversation split into prior turns and the new user prompt.
///
/// `history` never contains system messages and never contains the final
/// user turn; `prompt` is that final user turn's content, or empty when the
/// conversation does not end on a user message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatTurns {
    pub history: Vec<ChatMessage>,
    pub prompt: Option<ChatMessageContent>,
}

impl ChatTurns {
    pub fn split(messages: &[ChatMessage]) -> Self {
        let mut history: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .cloned()
            .collect();

        let prompt = match history.last() {
            Some(last) if last.role == ChatRole::User => history.pop().map(|m| m.content),
            _ => None,
        };

        Self { history, prompt }
    }

    /// Text of the new prompt (empty when there is none)
    pub fn prompt_text(&self) -> String {
        match &self.prompt {
            Some(content) => ChatMessage {
                role: ChatRole::User,
                content: content.clone(),
            }
            .text(),
            None => String::new(),
        }
    }
}

/// Machine-usable reason an adapter call did not produce text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RateLimited,
    Unauthenticated,
    Unreachable,
    NotConfigured,
    Upstream,
}

impl FailureReason {
    /// Classify a raw error chain by the markers vendors put in their errors
    pub fn classify(raw: &str) -> Self {
        const RATE_LIMITED: &[&str] = &[
            "429",
            "rate limit",
            "rate_limit",
            "quota",
            "resource_exhausted",
            "too many requests",
        ];
        const UNAUTHENTICATED: &[&str] = &[
            "401",
            "403",
            "unauthorized",
            "unauthenticated",
            "permission_denied",
            "forbidden",
            "invalid api key",
            "api key not valid",
            "invalid_api_key",
        ];
        const UNREACHABLE: &[&str] = &[
            "failed to send request",
            "error sending request",
            "connection refused",
            "connection reset",
            "dns error",
            "timed out",
            "timeout",
        ];

        let lower = raw.to_lowercase();
        if RATE_LIMITED.iter().any(|p| lower.contains(p)) {
            Self::RateLimited
        } else if UNAUTHENTICATED.iter().any(|p| lower.contains(p)) {
            Self::Unauthenticated
        } else if UNREACHABLE.iter().any(|p| lower.contains(p)) {
            Self::Unreachable
        } else {
            Self::Upstream
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Unauthenticated => "unauthenticated",
            Self::Unreachable => "unreachable",
            Self::NotConfigured => "not_configured",
            Self::Upstream => "upstream",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure value returned by every adapter.
///
/// `message` is meant for the end user and is shown verbatim in the chat.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub reason: FailureReason,
    pub message: String,
}

impl ProviderFailure {
    /// Fixed failure for a provider whose credential is missing or a placeholder
    pub fn not_configured(provider: ProviderKind) -> Self {
        Self {
            provider,
            reason: FailureReason::NotConfigured,
            message: format!(
                "Error: {} not set or invalid. Please check backend/.env or config.toml",
                provider.key_env()
            ),
        }
    }

    /// Map a raw upstream error into a reason tag and an Indonesian message
    pub fn from_error(provider: ProviderKind, err: &anyhow::Error) -> Self {
        let raw = format!("{err:#}");
        let reason = FailureReason::classify(&raw);
        Self {
            provider,
            reason,
            message: localized_message(provider, reason, &raw),
        }
    }
}

fn localized_message(provider: ProviderKind, reason: FailureReason, raw: &str) -> String {
    match (provider, reason) {
        (_, FailureReason::NotConfigured) => ProviderFailure::not_configured(provider).message,
        (ProviderKind::Gemini, FailureReason::RateLimited) => {
            "Maaf, kuota API Gemini (Google) sedang penuh. Silakan coba lagi nanti atau gunakan model lain."
                .to_string()
        }
        (_, FailureReason::RateLimited) => format!(
            "Maaf, kuota API {} sedang penuh. Silakan coba lagi nanti atau gunakan model lain.",
            provider.label()
        ),
        (_, FailureReason::Unauthenticated) => format!(
            "Maaf, kunci API {} ditolak. Periksa konfigurasi kredensial. Error: {}",
            provider.label(),
            raw
        ),
        (_, FailureReason::Unreachable) => format!(
            "Maaf, layanan {} tidak dapat dihubungi saat ini. Error: {}",
            provider.label(),
            raw
        ),
        (ProviderKind::Gemini, FailureReason::Upstream) => format!(
            "Maaf, terjadi kesalahan saat memproses permintaan Anda dengan Gemini. Error: {}",
            raw
        ),
        (_, FailureReason::Upstream) => format!(
            "Maaf, terjadi kesalahan dengan {}. Error: {}",
            provider.label(),
            raw
        ),
    }
}

/// Trait that all provider adapters implement.
///
/// `send` is total over [`ProviderFailure`]: it never panics or propagates
/// transport errors, and performs at most one outbound call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether a valid credential was supplied at construction
    fn is_configured(&self) -> bool;

    /// Send the split conversation to `model` with `system` as instruction
    async fn send(
        &self,
        model: &str,
        system: &str,
        turns: &ChatTurns,
    ) -> Result<String, ProviderFailure>;

    /// Failure reported in place of a call when the provider is unconfigured
    fn unavailable(&self) -> ProviderFailure {
        ProviderFailure::not_configured(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
        assert_eq!(ChatRole::System.to_string(), "system");
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("gemini"), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("Google"), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("grok"), Some(ProviderKind::Groq));
        assert_eq!(ProviderKind::parse("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("anthropic"), None);
    }

    #[test]
    fn test_fallback_order_never_contains_self() {
        for kind in ProviderKind::ALL {
            assert!(!kind.fallback_order().contains(&kind));
            assert_eq!(kind.fallback_order().len(), ProviderKind::ALL.len() - 1);
        }
    }

    #[test]
    fn test_message_deserialize_text_and_parts() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"halo"}"#).unwrap();
        assert_eq!(msg.text(), "halo");

        let msg: ChatMessage = serde_json::from_str(
            r#"{"role":"user","content":[
                {"type":"text","text":"apa ini?"},
                {"type":"image_url","image_url":{"url":"data:image/png;base64,AAAA"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(msg.text(), "apa ini?");
        assert!(matches!(msg.content, ChatMessageContent::Parts(ref p) if p.len() == 2));
    }

    #[test]
    fn test_split_last_user_is_prompt() {
        let msgs = vec![
            ChatMessage::system("ignored"),
            ChatMessage::user("Nama saya Budi"),
            ChatMessage::assistant("Halo Budi!"),
            ChatMessage::user("Siapa nama saya?"),
        ];
        let turns = ChatTurns::split(&msgs);
        assert_eq!(turns.history.len(), 2);
        assert_eq!(turns.history[0].role, ChatRole::User);
        assert_eq!(turns.history[1].role, ChatRole::Assistant);
        assert_eq!(turns.prompt_text(), "Siapa nama saya?");
    }

    #[test]
    fn test_split_last_assistant_has_no_prompt() {
        let msgs = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let turns = ChatTurns::split(&msgs);
        assert_eq!(turns.history.len(), 2);
        assert!(turns.prompt.is_none());
        assert_eq!(turns.prompt_text(), "");
    }

    #[test]
    fn test_split_repeated_content_keeps_earlier_turn() {
        // Same text twice: only the final turn becomes the prompt
        let msgs = vec![ChatMessage::user("lagi"), ChatMessage::user("lagi")];
        let turns = ChatTurns::split(&msgs);
        assert_eq!(turns.history.len(), 1);
        assert_eq!(turns.prompt_text(), "lagi");
    }

    #[test]
    fn test_split_empty() {
        let turns = ChatTurns::split(&[]);
        assert!(turns.history.is_empty());
        assert!(turns.prompt.is_none());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            FailureReason::classify("Gemini API request failed with status 429 Too Many Requests"),
            FailureReason::RateLimited
        );
        assert_eq!(
            FailureReason::classify("status 401 Unauthorized: invalid api key"),
            FailureReason::Unauthenticated
        );
        assert_eq!(
            FailureReason::classify("Failed to send request to Groq API: error sending request"),
            FailureReason::Unreachable
        );
        assert_eq!(
            FailureReason::classify("status 500: internal error"),
            FailureReason::Upstream
        );
    }

    #[test]
    fn test_gemini_quota_message() {
        let err = anyhow::anyhow!("Gemini API request failed with status 429: quota");
        let failure = ProviderFailure::from_error(ProviderKind::Gemini, &err);
        assert_eq!(failure.reason, FailureReason::RateLimited);
        assert!(failure.message.contains("kuota API Gemini"));
    }

    #[test]
    fn test_groq_upstream_message_carries_raw_error() {
        let err = anyhow::anyhow!("model_decommissioned");
        let failure = ProviderFailure::from_error(ProviderKind::Groq, &err);
        assert_eq!(failure.reason, FailureReason::Upstream);
        assert!(failure.message.starts_with("Maaf, terjadi kesalahan dengan Groq."));
        assert!(failure.message.contains("model_decommissioned"));
    }

    #[test]
    fn test_not_configured_names_env_var() {
        let failure = ProviderFailure::not_configured(ProviderKind::Groq);
        assert_eq!(failure.reason, FailureReason::NotConfigured);
        assert!(failure.to_string().contains("GROQ_API_KEY"));
    }
}
