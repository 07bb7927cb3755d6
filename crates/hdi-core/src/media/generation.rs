//! Image and video generation clients: Hugging Face Inference, OpenAI Images

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::providers::Credential;

pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_OPENAI_IMAGES_BASE_URL: &str = "https://api.openai.com";

const SDXL: &str = "stabilityai/stable-diffusion-xl-base-1.0";
const SD_21: &str = "stabilityai/stable-diffusion-2-1";
const FLUX: &str = "black-forest-labs/FLUX.1-schnell";

const VIDEO_UNAVAILABLE: &str = "🚧 **Fitur Video Sedang Tidak Tersedia**

Hugging Face **tidak lagi menyediakan** layanan Text-to-Video gratis secara serverless (sejak awal 2026).

**Alternatif yang bisa dipertimbangkan:**
1. **Replicate.com** - Menyediakan API video generation (berbayar per penggunaan)
2. **Fal.ai** - API cepat untuk video generation
3. **Self-hosting** - Jalankan model seperti Zeroscope di GPU sendiri

*Untuk saat ini, silakan gunakan fitur **HDI Image** untuk visualisasi.*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Credential missing; no call was made
    #[error("{0}")]
    NotConfigured(String),
    /// The capability is not offered at all
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Upstream(String),
}

/// Images returned by a generator, base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImages {
    pub images: Vec<String>,
    pub model: String,
}

/// Image generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn is_configured(&self) -> bool;
    async fn generate(&self, prompt: &str, model: &str) -> Result<GeneratedImages, MediaError>;
}

/// Hugging Face repo for an image model alias; unknown aliases get SDXL
pub fn hf_image_model(alias: &str) -> &'static str {
    match alias {
        "sdxl" | "default" | "hdi-image" => SDXL,
        "sd-2.1" => SD_21,
        "flux" | "hdi-image-flux" => FLUX,
        _ => SDXL,
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(180))
        .build()
        .expect("Failed to build HTTP client")
}

/// Hugging Face Inference API text-to-image
pub struct HuggingFaceImages {
    client: reqwest::Client,
    credential: Option<Credential>,
    base_url: String,
}

impl std::fmt::Debug for HuggingFaceImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceImages")
            .field("configured", &self.credential.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HuggingFaceImages {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            client: http_client(),
            credential,
            base_url: DEFAULT_HF_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call(&self, credential: &Credential, prompt: &str, model: &str) -> Result<Vec<u8>> {
        let url = format!("{}/models/{}", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .json(&serde_json::json!({ "inputs": prompt }))
            .send()
            .await
            .context("Failed to send Hugging Face inference request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Hugging Face error {}: {}", status, error_text));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Hugging Face returned no image: {}", body));
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read Hugging Face image")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImages {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<GeneratedImages, MediaError> {
        let Some(credential) = &self.credential else {
            return Err(MediaError::NotConfigured(
                "Hugging Face client not available. Please set HUGGINGFACE_API_KEY in .env".to_string(),
            ));
        };

        let repo = hf_image_model(model);
        info!("Generating image with Hugging Face model: {}", repo);
        debug!("Image prompt: {}", prompt.chars().take(100).collect::<String>());

        let bytes = self.call(credential, prompt, repo).await.map_err(|e| {
            error!("Hugging Face image generation error: {:#}", e);
            MediaError::Upstream(format!("{e:#}"))
        })?;

        info!("Image generated with Hugging Face ({} bytes)", bytes.len());
        Ok(GeneratedImages {
            images: vec![BASE64.encode(bytes)],
            model: repo.to_string(),
        })
    }
}

/// OpenAI Images API (DALL-E)
pub struct OpenAiImages {
    client: reqwest::Client,
    credential: Option<Credential>,
    base_url: String,
}

impl std::fmt::Debug for OpenAiImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImages")
            .field("configured", &self.credential.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl OpenAiImages {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            client: http_client(),
            credential,
            base_url: DEFAULT_OPENAI_IMAGES_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call(&self, credential: &Credential, prompt: &str, model: &str) -> Result<Vec<String>> {
        let url = format!("{}/v1/images/generations", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .json(&body)
            .send()
            .await
            .context("Failed to send OpenAI image request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI image error {}: {}", status, error_text));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI image response")?;
        let images: Vec<String> = parsed.data.into_iter().filter_map(|d| d.b64_json).collect();
        if images.is_empty() {
            return Err(anyhow!("OpenAI returned no images"));
        }
        Ok(images)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<GeneratedImages, MediaError> {
        let Some(credential) = &self.credential else {
            return Err(MediaError::NotConfigured(
                "OpenAI client not available. Please set OPENAI_API_KEY.".to_string(),
            ));
        };

        let images = self.call(credential, prompt, model).await.map_err(|e| {
            error!("OpenAI image generation error: {:#}", e);
            MediaError::Upstream(format!("{e:#}"))
        })?;

        Ok(GeneratedImages {
            images,
            model: model.to_string(),
        })
    }
}

/// Outcome of an image request, in the shape the HTTP API returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub success: bool,
    pub images: Vec<String>,
    pub model: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoResult {
    pub success: bool,
    pub video_base64: Option<String>,
    pub model: String,
    pub error: Option<String>,
}

/// Dispatches media requests to the right backend
pub struct MediaService {
    huggingface: Arc<dyn ImageGenerator>,
    openai: Arc<dyn ImageGenerator>,
}

impl MediaService {
    pub fn new(huggingface: Arc<dyn ImageGenerator>, openai: Arc<dyn ImageGenerator>) -> Self {
        Self {
            huggingface,
            openai,
        }
    }

    fn backend_for(&self, alias: &str) -> &Arc<dyn ImageGenerator> {
        match alias {
            "dall-e-2" | "dall-e-3" => &self.openai,
            // huggingface, sdxl, sd-2.1, flux, default, hdi-image*, and anything else
            _ => &self.huggingface,
        }
    }

    pub async fn generate_image(&self, prompt: &str, alias: &str) -> ImageResult {
        let backend = self.backend_for(alias);
        debug!("Image request for '{}' routed to {}", alias, backend.name());

        match backend.generate(prompt, alias).await {
            Ok(generated) => ImageResult {
                success: true,
                images: generated.images,
                model: generated.model,
                error: None,
            },
            Err(e) => ImageResult {
                success: false,
                images: Vec::new(),
                model: alias.to_string(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Text-to-video is not offered; always reports why
    pub async fn generate_video(&self, _prompt: &str, model: &str) -> VideoResult {
        VideoResult {
            success: false,
            video_base64: None,
            model: model.to_string(),
            error: Some(MediaError::Unavailable(VIDEO_UNAVAILABLE.to_string()).to_string()),
        }
    }
}
