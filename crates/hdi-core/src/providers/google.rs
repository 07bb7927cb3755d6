//! Google Gemini provider
//!
//! Gemini takes the system instruction out of band and wants the prior turns
//! separately from the new user prompt, with `assistant` renamed to `model`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::credential::Credential;
use super::types::{
    ChatMessage, ChatMessageContent, ChatRole, ChatTurns, ContentPart, LlmProvider,
    ProviderFailure, ProviderKind,
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    credential: Option<Credential>,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("configured", &self.credential.is_some())
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(credential: Option<Credential>, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            credential,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            max_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the `generateContent` body: prior turns, then the new prompt
    fn build_request(&self, system: &str, turns: &ChatTurns) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = turns.history.iter().map(to_gemini_content).collect();

        let prompt = turns
            .prompt
            .clone()
            .unwrap_or_else(|| ChatMessageContent::Text(String::new()));
        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: to_gemini_parts(&prompt),
        });

        GeminiRequest {
            contents,
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart::Text {
                    text: system.to_string(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        }
    }

    /// Concatenate the text parts of the first candidate
    fn extract_text(resp: GeminiApiResponse) -> Result<String> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response had no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match p {
                GeminiPart::Text { text } => Some(text),
                GeminiPart::InlineData { .. } => None,
            })
            .collect();

        if text.is_empty() {
            return Err(anyhow!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(text)
    }

    async fn call(&self, credential: &Credential, model: &str, system: &str, turns: &ChatTurns) -> Result<String> {
        // The key travels in a header so transport errors, which print the
        // URL, cannot carry it into replies or logs.
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = self.build_request(system, turns);

        debug!(
            "Gemini request: model={}, history={}",
            model,
            turns.history.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        Self::extract_text(api_response)
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn send(
        &self,
        model: &str,
        system: &str,
        turns: &ChatTurns,
    ) -> Result<String, ProviderFailure> {
        let Some(credential) = &self.credential else {
            return Err(self.unavailable());
        };

        self.call(credential, model, system, turns).await.map_err(|e| {
            let failure = ProviderFailure::from_error(ProviderKind::Gemini, &e);
            error!("Gemini error ({}): {:#}", failure.reason, e);
            failure
        })
    }
}

fn to_gemini_content(message: &ChatMessage) -> GeminiContent {
    let role = match message.role {
        ChatRole::Assistant => "model",
        ChatRole::User | ChatRole::System => "user",
    };
    GeminiContent {
        role: role.to_string(),
        parts: to_gemini_parts(&message.content),
    }
}

fn to_gemini_parts(content: &ChatMessageContent) -> Vec<GeminiPart> {
    match content {
        ChatMessageContent::Text(t) => vec![GeminiPart::Text { text: t.clone() }],
        ChatMessageContent::Parts(parts) => parts
            .iter()
            .map(|p| match p {
                ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
                ContentPart::ImageUrl { image_url } => match parse_data_url(&image_url.url) {
                    Some((mime_type, data)) => GeminiPart::InlineData {
                        inline_data: GeminiInlineData { mime_type, data },
                    },
                    // Gemini only takes inline bytes here; remote URLs go as text
                    None => GeminiPart::Text {
                        text: format!("[image: {}]", image_url.url),
                    },
                },
            })
            .collect(),
    }
}

/// Split `data:<mime>;base64,<payload>` into its mime type and payload
fn parse_data_url(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((mime.to_string(), data.to_string()))
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiSystemInstruction,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(Credential::parse("AIza-test-key-123"), 2048)
    }

    #[tokio::test]
    async fn test_unreachable_failure_does_not_leak_key() {
        let key = "AIzaSyRefusedPortKey0000";
        let provider = GoogleProvider::new(Credential::parse(key), 2048).with_base_url("http://127.0.0.1:1");
        let turns = ChatTurns::split(&[ChatMessage::user("halo")]);

        let failure = provider
            .send("gemini-1.5-flash", "sys", &turns)
            .await
            .unwrap_err();
        assert_eq!(failure.provider, ProviderKind::Gemini);
        assert!(!failure.message.contains(key), "key leaked: {}", failure.message);
        assert!(!failure.message.contains("key="));
    }

    #[test]
    fn test_request_splits_history_and_prompt() {
        let turns = ChatTurns::split(&[
            ChatMessage::system("client system"),
            ChatMessage::user("Nama saya Budi"),
            ChatMessage::assistant("Halo Budi"),
            ChatMessage::user("Siapa nama saya?"),
        ]);
        let req = provider().build_request("SYSTEM", &turns);

        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[0].role, "user");
        assert_eq!(req.contents[1].role, "model");
        assert_eq!(req.contents[2].role, "user");
        assert!(matches!(&req.contents[2].parts[0], GeminiPart::Text { text } if text == "Siapa nama saya?"));
        assert!(matches!(&req.system_instruction.parts[0], GeminiPart::Text { text } if text == "SYSTEM"));
    }

    #[test]
    fn test_request_wire_shape() {
        let turns = ChatTurns::split(&[ChatMessage::user("halo")]);
        let json = serde_json::to_value(provider().build_request("sys", &turns)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "halo");
    }

    #[test]
    fn test_request_without_trailing_user_sends_empty_prompt() {
        let turns = ChatTurns::split(&[ChatMessage::user("a"), ChatMessage::assistant("b")]);
        let req = provider().build_request("sys", &turns);
        assert_eq!(req.contents.len(), 3);
        assert!(matches!(&req.contents[2].parts[0], GeminiPart::Text { text } if text.is_empty()));
    }

    #[test]
    fn test_inline_image_part() {
        let parts = to_gemini_parts(&ChatMessageContent::Parts(vec![ContentPart::ImageUrl {
            image_url: super::super::types::ImageUrl {
                url: "data:image/png;base64,iVBOR".to_string(),
            },
        }]));
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json[0]["inlineData"]["data"], "iVBOR");
    }

    #[test]
    fn test_extract_text() {
        let resp: GeminiApiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Halo "},{"text":"Budi"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(GoogleProvider::extract_text(resp).unwrap(), "Halo Budi");
    }

    #[test]
    fn test_extract_text_blocked() {
        let resp: GeminiApiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        let err = GoogleProvider::extract_text(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let resp: GeminiApiResponse = serde_json::from_str("{}").unwrap();
        assert!(GoogleProvider::extract_text(resp).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_returns_fixed_failure() {
        let p = GoogleProvider::new(Credential::parse("your_key_here"), 1024);
        assert!(!p.is_configured());
        let err = p
            .send("gemini-1.5-flash", "sys", &ChatTurns::split(&[ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.reason, super::super::types::FailureReason::NotConfigured);
        assert!(err.message.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("AIza-test-key-123"));
    }
}
