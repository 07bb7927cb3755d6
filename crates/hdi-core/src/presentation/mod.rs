//! Presentation generation: model-written outline rendered as a .pptx deck

pub mod deck;
pub mod outline;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tracing::{error, info};

use crate::providers::{ChatMessage, ModelRouter};

pub use deck::{DeckBuilder, DeckError};
pub use outline::{Outline, OutlineSlide, parse_outline};

/// Model id the outline is requested from
pub const OUTLINE_MODEL: &str = "hdi-4";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationResult {
    pub success: bool,
    pub pptx_base64: Option<String>,
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides_count: Option<usize>,
    pub error: Option<String>,
}

impl PresentationResult {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pptx_base64: None,
            filename: None,
            slides_count: None,
            error: Some(error.into()),
        }
    }
}

pub fn outline_prompt(topic: &str) -> String {
    format!(
        "Buatkan outline presentasi tentang: {topic}

Berikan output dalam format berikut:
JUDUL: [Judul presentasi]

SLIDE 1:
Judul: [Judul slide]
- [Poin 1]
- [Poin 2]
- [Poin 3]

SLIDE 2:
Judul: [Judul slide]
- [Poin 1]
- [Poin 2]
- [Poin 3]

(Lanjutkan sampai 5-7 slide)

Fokus pada konten yang informatif dan terstruktur."
    )
}

/// `ChatHDI_<topic>.pptx`, topic cut to 30 chars of alphanumerics, space, `-`, `_`
pub fn deck_filename(topic: &str) -> String {
    let safe: String = topic
        .chars()
        .take(30)
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    format!("ChatHDI_{}.pptx", safe.trim())
}

/// Ask the router for an outline on `topic` and render it
pub async fn generate_from_topic(router: &ModelRouter, topic: &str) -> PresentationResult {
    let messages = [ChatMessage::user(outline_prompt(topic))];
    let result = router.chat(&messages, OUTLINE_MODEL).await;

    let outline = parse_outline(&result.text);
    if outline.slides.is_empty() {
        if let Some(reason) = result.failure {
            error!("Outline request failed ({}): {}", reason, result.text);
        }
        return PresentationResult::failed("Gagal mengekstrak konten slide dari AI");
    }

    let bytes = match DeckBuilder::new().build(&outline.title, &outline.slides) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("PPTX generation error: {}", e);
            return PresentationResult::failed(e.to_string());
        }
    };

    info!(
        "Generated deck '{}' ({} content slides) via {}",
        outline.title,
        outline.slides.len(),
        result.provider
    );

    PresentationResult {
        success: true,
        pptx_base64: Some(BASE64.encode(bytes)),
        filename: Some(deck_filename(topic)),
        slides_count: Some(outline.slides.len() + 2),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatTurns, LlmProvider, ProviderFailure, ProviderKind};
    use crate::registry::ModelRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct CannedProvider(&'static str);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Gemini
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn send(&self, _model: &str, _system: &str, turns: &ChatTurns) -> Result<String, ProviderFailure> {
            assert!(turns.prompt_text().starts_with("Buatkan outline presentasi tentang:"));
            Ok(self.0.to_string())
        }
    }

    fn router(reply: &'static str) -> ModelRouter {
        ModelRouter::new(
            ModelRegistry::builtin(),
            vec![Arc::new(CannedProvider(reply)) as Arc<dyn LlmProvider>],
            "sys",
        )
        .unwrap()
    }

    #[test]
    fn test_deck_filename() {
        assert_eq!(deck_filename("Energi Hidrogen: masa depan?"), "ChatHDI_Energi Hidrogen masa depan.pptx");
        assert_eq!(
            deck_filename("abcdefghijklmnopqrstuvwxyz0123456789"),
            "ChatHDI_abcdefghijklmnopqrstuvwxyz0123.pptx"
        );
        assert_eq!(deck_filename("  "), "ChatHDI_.pptx");
    }

    #[tokio::test]
    async fn test_generate_from_topic() {
        let r = router("JUDUL: Fuel Cell\n\nSLIDE 1:\nJudul: Dasar\n- Anoda\n- Katoda\n\nSLIDE 2:\nJudul: Jenis\n- PEMFC\n- SOFC");
        let result = generate_from_topic(&r, "Fuel Cell").await;
        assert!(result.success);
        assert_eq!(result.slides_count, Some(4));
        assert_eq!(result.filename.as_deref(), Some("ChatHDI_Fuel Cell.pptx"));
        let bytes = BASE64.decode(result.pptx_base64.unwrap()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_generate_without_slides_fails() {
        let r = router("Maaf, saya tidak bisa.");
        let result = generate_from_topic(&r, "x").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Gagal mengekstrak konten slide dari AI"));
        assert!(result.pptx_base64.is_none());
    }
}
