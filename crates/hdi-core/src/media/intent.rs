//! Media intent detection
//!
//! Heuristic keyword matching over the latest user utterance. Rules are
//! checked in order and the first hit wins; there is no confidence score,
//! so adversarial or unusual phrasing can be misclassified.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::templates::detect_template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    None,
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// What the utterance asks for, and the prompt to use for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIntent {
    pub kind: MediaKind,
    pub prompt: String,
    /// Engineering template that produced `prompt`, if any
    pub template: Option<&'static str>,
}

impl MediaIntent {
    pub fn none(utterance: &str) -> Self {
        Self {
            kind: MediaKind::None,
            prompt: utterance.to_string(),
            template: None,
        }
    }

    /// Forced intent from an explicit media model id
    pub fn forced(kind: MediaKind, utterance: &str) -> Self {
        Self {
            kind,
            prompt: utterance.to_string(),
            template: None,
        }
    }
}

struct IntentRule {
    kind: MediaKind,
    keywords: &'static [&'static str],
}

/// Video before image: video phrasing often contains image triggers too
const RULES: &[IntentRule] = &[
    IntentRule {
        kind: MediaKind::Video,
        keywords: &[
            "buatkan video", "buat video", "generate video", "create video",
            "animasi", "animation", "video tentang", "rekam", "buat animasi",
            "visualisasi video", "video ilustrasi", "make a video", "make video",
            "video of", "create a video",
        ],
    },
    IntentRule {
        kind: MediaKind::Image,
        keywords: &[
            "buatkan gambar", "buat gambar", "generate image", "create image",
            "gambarkan", "visualisasi", "ilustrasi", "draw", "sketch",
            "buat ilustrasi", "generate illustration", "tolong gambar",
            "buatkan ilustrasi", "tampilkan gambar", "buat visual",
            "desain gambar", "design image", "create visual", "buat desain",
            "gambar tentang", "ilustrasikan",
        ],
    },
];

/// Classify `utterance` as text chat, image or video request
pub fn detect(utterance: &str) -> MediaIntent {
    let lower = utterance.to_lowercase();

    let Some(rule) = RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| lower.contains(k)))
    else {
        return MediaIntent::none(utterance);
    };

    match rule.kind {
        MediaKind::Image => match detect_template(utterance) {
            Some(template) => {
                let prompt = template.render(utterance);
                debug!(
                    "Engineering template '{}' selected ({} chars)",
                    template.id,
                    prompt.len()
                );
                MediaIntent {
                    kind: MediaKind::Image,
                    prompt,
                    template: Some(template.id),
                }
            }
            None => MediaIntent::forced(MediaKind::Image, utterance),
        },
        kind => MediaIntent::forced(kind, utterance),
    }
}
