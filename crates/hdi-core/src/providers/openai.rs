//! OpenAI chat-completions provider (GPT-4o family)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use super::credential::Credential;
use super::types::{
    ChatMessageContent, ChatRole, ChatTurns, LlmProvider, ProviderFailure, ProviderKind,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI provider. Also the wire implementation behind every
/// OpenAI-compatible vendor (see [`super::openai_compat`]).
pub struct OpenAiProvider {
    client: Client,
    credential: Option<Credential>,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("configured", &self.credential.is_some())
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(credential: Option<Credential>, base_url: String, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            credential,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Flatten into one array: system instruction, prior turns, new prompt
    pub(crate) fn to_openai_messages(system: &str, turns: &ChatTurns) -> Vec<OpenAiMessage> {
        let mut result = vec![OpenAiMessage {
            role: "system".to_string(),
            content: Value::String(system.to_string()),
        }];

        for msg in &turns.history {
            if msg.role == ChatRole::System {
                continue;
            }
            result.push(OpenAiMessage {
                role: msg.role.to_string(),
                content: to_openai_content(&msg.content),
            });
        }

        if let Some(prompt) = &turns.prompt {
            result.push(OpenAiMessage {
                role: "user".to_string(),
                content: to_openai_content(prompt),
            });
        }

        result
    }

    fn extract_text(resp: OpenAiApiResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion had no choices"))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    /// One chat-completions call; `label` only tags log lines and errors
    pub(crate) async fn call(&self, label: &str, model: &str, system: &str, turns: &ChatTurns) -> Result<String> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| anyhow!("{} API key not configured", label))?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let messages = Self::to_openai_messages(system, turns);

        let body = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });

        debug!("{} request: model={}, messages={}", label, model, messages.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", label))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "{} API request failed with status {}: {}",
                label,
                status,
                error_text
            ));
        }

        let api_response: OpenAiApiResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", label))?;

        debug!(
            "{} response: choices={}, finish_reason={:?}",
            label,
            api_response.choices.len(),
            api_response.choices.first().and_then(|c| c.finish_reason.as_deref())
        );

        Self::extract_text(api_response)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn is_configured(&self) -> bool {
        OpenAiProvider::is_configured(self)
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
        self.call("OpenAI", model, system, turns).await.map_err(|e| {
            let failure = ProviderFailure::from_error(ProviderKind::OpenAi, &e);
            error!("OpenAI error ({}): {:#}", failure.reason, e);
            failure
        })
    }
}

fn to_openai_content(content: &ChatMessageContent) -> Value {
    match content {
        ChatMessageContent::Text(t) => Value::String(t.clone()),
        ChatMessageContent::Parts(parts) => serde_json::to_value(parts).unwrap_or(Value::Null),
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenAiMessage {
    pub role: String,
    pub content: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiApiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}
