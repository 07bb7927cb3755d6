//! OpenAI-compatible provider for Groq-hosted Llama models.
//!
//! Reuses the OpenAI wire format with Groq's base URL and reports itself as
//! [`ProviderKind::Groq`] so failures carry Groq's key name and label.

use async_trait::async_trait;
use tracing::error;

use super::credential::Credential;
use super::openai::OpenAiProvider;
use super::types::{ChatTurns, LlmProvider, ProviderFailure, ProviderKind};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai";

/// OpenAI-compatible provider that wraps [`OpenAiProvider`] under another kind
pub struct OpenAiCompatProvider {
    inner: OpenAiProvider,
    kind: ProviderKind,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// - `kind`: which vendor this endpoint stands for
    /// - `base_url`: the endpoint root, without the `/v1/chat/completions` suffix
    pub fn new(
        kind: ProviderKind,
        credential: Option<Credential>,
        base_url: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            inner: OpenAiProvider::new(credential, base_url, max_tokens),
            kind,
        }
    }

    pub fn groq(credential: Option<Credential>, max_tokens: u32) -> Self {
        Self::new(
            ProviderKind::Groq,
            credential,
            DEFAULT_GROQ_BASE_URL.to_string(),
            max_tokens,
        )
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn send(
        &self,
        model: &str,
        system: &str,
        turns: &ChatTurns,
    ) -> Result<String, ProviderFailure> {
        if !self.is_configured() {
            return Err(self.unavailable());
        }
        self.inner
            .call(self.kind.label(), model, system, turns)
            .await
            .map_err(|e| {
                let failure = ProviderFailure::from_error(self.kind, &e);
                error!("{} error ({}): {:#}", self.kind.label(), failure.reason, e);
                failure
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{ChatMessage, FailureReason};

    #[test]
    fn test_groq_defaults() {
        let p = OpenAiCompatProvider::groq(Credential::parse("gsk_live_0123456789"), 4096);
        assert_eq!(p.kind(), ProviderKind::Groq);
        assert!(p.is_configured());
        assert_eq!(p.base_url(), "https://api.groq.com/openai");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::new(
            ProviderKind::Groq,
            None,
            "http://localhost:8080/openai/".to_string(),
            1024,
        );
        assert_eq!(p.base_url(), "http://localhost:8080/openai");
    }

    #[tokio::test]
    async fn test_unconfigured_names_groq_key() {
        let p = OpenAiCompatProvider::groq(None, 1024);
        let err = p
            .send(
                "llama-3.3-70b-versatile",
                "sys",
                &ChatTurns::split(&[ChatMessage::user("hi")]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.provider, ProviderKind::Groq);
        assert_eq!(err.reason, FailureReason::NotConfigured);
        assert!(err.message.contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_debug_hides_key() {
        let p = OpenAiCompatProvider::groq(Credential::parse("gsk_live_0123456789"), 4096);
        let debug = format!("{:?}", p);
        assert!(debug.contains("Groq"));
        assert!(!debug.contains("gsk_live_0123456789"));
    }
}
