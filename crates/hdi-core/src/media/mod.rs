//! Media intent detection, engineering prompt templates and generation clients

pub mod generation;
pub mod intent;
pub mod templates;

pub use generation::{
    GeneratedImages, HuggingFaceImages, ImageGenerator, ImageResult, MediaError, MediaService,
    OpenAiImages, VideoResult,
};
pub use intent::{MediaIntent, MediaKind, detect};
pub use templates::{EngineeringTemplate, TEMPLATES};
