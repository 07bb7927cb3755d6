//! Chat orchestration: media intent first, then the routed text chat

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::media::{MediaIntent, MediaKind, MediaService, detect};
use crate::providers::{ChatMessage, ChatTurns, ModelRouter, ProviderKind};

/// Reply for one `/api/chat` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// Requested model id, or the media model that produced `media_data`
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<ProviderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub media_type: Option<MediaKind>,
    pub media_data: Option<Vec<String>>,
}

/// Model ids that force a media intent regardless of the utterance
fn forced_intent(model_id: &str, utterance: &str) -> Option<MediaIntent> {
    match model_id {
        "hdi-image" | "hdi-image-flux" => Some(MediaIntent::forced(MediaKind::Image, utterance)),
        "hdi-video" => Some(MediaIntent::forced(MediaKind::Video, utterance)),
        _ => None,
    }
}

pub struct ChatService {
    router: Arc<ModelRouter>,
    media: Arc<MediaService>,
}

impl ChatService {
    pub fn new(router: Arc<ModelRouter>, media: Arc<MediaService>) -> Self {
        Self { router, media }
    }

    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }

    pub fn media(&self) -> &Arc<MediaService> {
        &self.media
    }

    pub async fn handle(&self, messages: &[ChatMessage], model_id: &str) -> ChatReply {
        // Same utterance the adapters receive as the prompt
        let utterance = ChatTurns::split(messages).prompt_text();
        let intent = forced_intent(model_id, &utterance).unwrap_or_else(|| detect(&utterance));

        match intent.kind {
            MediaKind::Image => self.handle_image(messages, model_id, &intent.prompt).await,
            MediaKind::Video => self.handle_video(model_id, &intent.prompt).await,
            MediaKind::None => self.text_reply(messages, model_id).await,
        }
    }

    async fn handle_image(&self, messages: &[ChatMessage], model_id: &str, prompt: &str) -> ChatReply {
        let alias = match model_id {
            "hdi-image" | "hdi-image-flux" => model_id,
            _ => "huggingface",
        };

        let result = self.media.generate_image(prompt, alias).await;
        if result.success {
            info!("Image generated for chat with {}", result.model);
            let excerpt: String = prompt.chars().take(100).collect();
            return ChatReply {
                response: format!(
                    "Saya telah membuat gambar berdasarkan permintaan: \"{}...\"",
                    excerpt
                ),
                model: result.model,
                provider_used: None,
                model_used: None,
                media_type: Some(MediaKind::Image),
                media_data: Some(result.images),
            };
        }

        let error = result.error.unwrap_or_default();
        warn!("Image generation failed, answering with text: {}", error);
        let mut reply = self.text_reply(messages, model_id).await;
        reply.response = format!(
            "Maaf, gagal membuat gambar: {}\n\nSebagai gantinya, berikut penjelasan:\n\n{}",
            error, reply.response
        );
        reply
    }

    async fn handle_video(&self, model_id: &str, prompt: &str) -> ChatReply {
        let result = self.media.generate_video(prompt, "hdi-video").await;
        if result.success {
            return ChatReply {
                response: format!("Saya telah membuat video berdasarkan permintaan: \"{}\"", prompt),
                model: result.model,
                provider_used: None,
                model_used: None,
                media_type: Some(MediaKind::Video),
                media_data: result.video_base64.map(|v| vec![v]),
            };
        }

        ChatReply {
            response: format!(
                "❌ **Gagal Membuat Video**\n\nDetail Error:\n`{}`\n\nSilakan coba lagi atau cek konfigurasi API.",
                result.error.unwrap_or_default()
            ),
            model: model_id.to_string(),
            provider_used: None,
            model_used: None,
            media_type: None,
            media_data: None,
        }
    }

    async fn text_reply(&self, messages: &[ChatMessage], model_id: &str) -> ChatReply {
        let result = self.router.chat(messages, model_id).await;
        ChatReply {
            response: result.text,
            model: model_id.to_string(),
            provider_used: Some(result.provider),
            model_used: Some(result.model),
            media_type: None,
            media_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{GeneratedImages, ImageGenerator, MediaError};
    use crate::providers::{LlmProvider, ProviderFailure};
    use crate::registry::ModelRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Gemini
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn send(&self, _model: &str, _system: &str, turns: &ChatTurns) -> Result<String, ProviderFailure> {
            Ok(format!("echo: {}", turns.prompt_text()))
        }
    }

    struct RecordingImages {
        fail: bool,
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ImageGenerator for RecordingImages {
        fn name(&self) -> &str {
            "recording"
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn generate(&self, prompt: &str, model: &str) -> Result<GeneratedImages, MediaError> {
            self.prompts.lock().unwrap().push((prompt.to_string(), model.to_string()));
            if self.fail {
                return Err(MediaError::Upstream("model loading".to_string()));
            }
            Ok(GeneratedImages {
                images: vec!["iVBOR".to_string()],
                model: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            })
        }
    }

    fn service(fail_images: bool) -> (ChatService, Arc<RecordingImages>) {
        let router = ModelRouter::new(
            ModelRegistry::builtin(),
            vec![Arc::new(EchoProvider) as Arc<dyn LlmProvider>],
            "sys",
        )
        .unwrap();
        let images = Arc::new(RecordingImages {
            fail: fail_images,
            prompts: Mutex::new(Vec::new()),
        });
        let media = MediaService::new(images.clone(), images.clone());
        (ChatService::new(Arc::new(router), Arc::new(media)), images)
    }

    #[tokio::test]
    async fn test_plain_chat_reports_provider() {
        let (svc, images) = service(false);
        let reply = svc.handle(&[ChatMessage::user("Halo")], "hdi-grok").await;
        assert_eq!(reply.response, "echo: Halo");
        assert_eq!(reply.model, "hdi-grok");
        // Groq is not registered, so Gemini stands in
        assert_eq!(reply.provider_used, Some(ProviderKind::Gemini));
        assert_eq!(reply.model_used.as_deref(), Some("gemini-1.5-flash"));
        assert!(reply.media_type.is_none());
        assert!(images.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hdi_image_overrides_detection() {
        let (svc, images) = service(false);
        let reply = svc.handle(&[ChatMessage::user("kucing oranye")], "hdi-image").await;
        assert_eq!(reply.media_type, Some(MediaKind::Image));
        assert_eq!(reply.media_data, Some(vec!["iVBOR".to_string()]));
        assert_eq!(
            reply.response,
            "Saya telah membuat gambar berdasarkan permintaan: \"kucing oranye...\""
        );
        let recorded = images.prompts.lock().unwrap();
        assert_eq!(recorded[0], ("kucing oranye".to_string(), "hdi-image".to_string()));
    }

    #[tokio::test]
    async fn test_detected_image_uses_template_prompt() {
        let (svc, images) = service(false);
        svc.handle(&[ChatMessage::user("Gambarkan reactor untuk amonia")], "hdi-4").await;
        let recorded = images.prompts.lock().unwrap();
        assert!(recorded[0].0.starts_with("High-detail industrial CAD rendering of reactor"));
        assert_eq!(recorded[0].1, "huggingface");
    }

    #[tokio::test]
    async fn test_image_failure_falls_back_to_text() {
        let (svc, _) = service(true);
        let reply = svc.handle(&[ChatMessage::user("buat gambar kucing")], "hdi-4").await;
        assert!(reply.response.starts_with("Maaf, gagal membuat gambar: model loading"));
        assert!(reply.response.ends_with("echo: buat gambar kucing"));
        assert!(reply.media_type.is_none());
        assert_eq!(reply.provider_used, Some(ProviderKind::Gemini));
    }

    #[tokio::test]
    async fn test_video_reports_failure_without_text_chat() {
        let (svc, _) = service(false);
        let reply = svc.handle(&[ChatMessage::user("buatkan video turbin angin")], "hdi-4").await;
        assert!(reply.response.starts_with("❌ **Gagal Membuat Video**"));
        assert!(reply.response.contains("Fitur Video Sedang Tidak Tersedia"));
        assert!(reply.provider_used.is_none());
        assert_eq!(reply.model, "hdi-4");
    }

    #[tokio::test]
    async fn test_trailing_system_message_is_not_the_utterance() {
        let (svc, images) = service(false);
        let messages = [ChatMessage::user("Halo"), ChatMessage::system("buat gambar kucing")];
        let reply = svc.handle(&messages, "hdi-4").await;
        assert_eq!(reply.response, "echo: Halo");
        assert!(reply.media_type.is_none());
        assert!(images.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_messages_are_plain_chat() {
        let (svc, _) = service(false);
        let reply = svc.handle(&[], "hdi-4").await;
        assert_eq!(reply.response, "echo: ");
    }
}
