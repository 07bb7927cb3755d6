use anyhow::{Context, Result, anyhow};
use hdi_core::providers::mask_secret;
use hdi_core::{ModelRegistry, ProviderBinding, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HdiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            system_prompt_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_google")]
    pub google: ProviderConfig,
    #[serde(default = "default_groq")]
    pub groq: ProviderConfig,
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
}

/// One chat provider endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn provider_at(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        api_key: String::new(),
        base_url: base_url.to_string(),
        max_tokens: default_max_tokens(),
    }
}

fn default_google() -> ProviderConfig {
    provider_at(hdi_core::providers::google::DEFAULT_GEMINI_BASE_URL)
}

fn default_groq() -> ProviderConfig {
    provider_at(hdi_core::providers::openai_compat::DEFAULT_GROQ_BASE_URL)
}

fn default_openai() -> ProviderConfig {
    provider_at(hdi_core::providers::openai::DEFAULT_OPENAI_BASE_URL)
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: default_google(),
            groq: default_groq(),
            openai: default_openai(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub huggingface_api_key: String,
    #[serde(default = "default_hf_base_url")]
    pub huggingface_base_url: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_openai_images_base_url")]
    pub openai_base_url: String,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("huggingface_api_key", &mask_secret(&self.huggingface_api_key))
            .field("huggingface_base_url", &self.huggingface_base_url)
            .field("openai_api_key", &mask_secret(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .finish()
    }
}

fn default_hf_base_url() -> String {
    hdi_core::media::generation::DEFAULT_HF_BASE_URL.to_string()
}

fn default_openai_images_base_url() -> String {
    hdi_core::media::generation::DEFAULT_OPENAI_IMAGES_BASE_URL.to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            huggingface_api_key: String::new(),
            huggingface_base_url: default_hf_base_url(),
            openai_api_key: String::new(),
            openai_base_url: default_openai_images_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_conversations")]
    pub conversations: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<String>,
}

fn default_conversations() -> String {
    "~/.hdi/data/conversations.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            conversations: default_conversations(),
            reference_data: None,
        }
    }
}

/// A `[[models]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub description: String,
}

/// Variables that `${VAR}` placeholders may expand to
const ALLOWED_ENV_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GROQ_API_KEY",
    "GROK_API_KEY",
    "OPENAI_API_KEY",
    "EMERGENT_LLM_KEY",
    "HUGGINGFACE_API_KEY",
    "HDI_DATA_DIR",
    "HOME",
    "USER",
];

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hdi")
}

impl HdiConfig {
    /// Load `custom_path`, or `~/.hdi/config.toml`, or the embedded default
    /// when neither exists
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok();

        let content = match custom_path {
            Some(path) => read_config(path)?,
            None => {
                let path = config_dir().join("config.toml");
                if path.exists() {
                    read_config(&path)?
                } else {
                    debug!("No config at {}, using built-in defaults", path.display());
                    DEFAULT_CONFIG.to_string()
                }
            }
        };

        let mut config = Self::parse(&content, env)?;
        config.apply_key_fallbacks(env);
        Ok(config)
    }

    /// Expand allowlisted `${VAR}`s through `lookup`, then parse
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let config: Self = toml::from_str(&expanded).context("Failed to parse config")?;

        for (name, key) in [
            ("google", &config.providers.google.api_key),
            ("groq", &config.providers.groq.api_key),
            ("openai", &config.providers.openai.api_key),
        ] {
            if looks_hardcoded(content, key) {
                warn!(
                    "{} API key is hardcoded in config file. For security, use environment variables",
                    name
                );
            }
        }

        Ok(config)
    }

    /// Fill empty keys from the alternate variable names deployments use
    pub fn apply_key_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |slot: &mut String, var: &str| {
            if slot.trim().is_empty() {
                if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                    debug!("Using {} as fallback key", var);
                    *slot = value;
                }
            }
        };

        fill(&mut self.providers.groq.api_key, "GROK_API_KEY");
        fill(&mut self.providers.openai.api_key, "EMERGENT_LLM_KEY");

        if self.media.openai_api_key.trim().is_empty() {
            self.media.openai_api_key = self.providers.openai.api_key.clone();
        }
    }

    /// `[[models]]` when declared, the built-in registry otherwise
    pub fn registry(&self) -> Result<ModelRegistry> {
        let builtin = ModelRegistry::builtin();
        if self.models.is_empty() {
            return Ok(builtin);
        }

        let mut entries = Vec::with_capacity(self.models.len());
        for entry in &self.models {
            let provider = ProviderKind::parse(&entry.provider).ok_or_else(|| {
                anyhow!("Unknown provider '{}' for model '{}'", entry.provider, entry.id)
            })?;
            entries.push((
                entry.id.clone(),
                ProviderBinding::new(provider, entry.model.clone(), entry.description.clone()),
            ));
        }

        let registry = ModelRegistry::from_bindings(builtin.default_binding().clone(), entries)?;
        info!("Loaded {} models from config", registry.len());
        Ok(registry)
    }

    /// Copy with every secret masked, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for provider in [
            &mut copy.providers.google,
            &mut copy.providers.groq,
            &mut copy.providers.openai,
        ] {
            provider.api_key = mask_secret(&provider.api_key);
        }
        copy.media.huggingface_api_key = mask_secret(&copy.media.huggingface_api_key);
        copy.media.openai_api_key = mask_secret(&copy.media.openai_api_key);
        copy
    }

    pub fn conversations_path(&self) -> PathBuf {
        shellexpand(&self.storage.conversations)
    }

    pub fn reference_data_path(&self) -> Option<PathBuf> {
        self.storage.reference_data.as_deref().map(shellexpand)
    }

    pub fn system_prompt_path(&self) -> Option<PathBuf> {
        self.server.system_prompt_file.as_deref().map(shellexpand)
    }
}

fn read_config(path: &Path) -> Result<String> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                warn!(
                    "Config file {} is readable by other users ({:o}). It may contain secrets. Fix with: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                );
            }
        }
    }

    std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config at {}. Run `hdi init` first.",
            path.display()
        )
    })
}

/// A key present in the raw file as a literal rather than a placeholder
fn looks_hardcoded(raw: &str, key: &str) -> bool {
    !key.is_empty() && raw.contains(key)
}

fn expand_env_vars<F>(s: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(start) = result[pos..].find("${") {
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(&var_name).unwrap_or_default();
        result.replace_range(abs_start..abs_start + end + 1, &value);
        pos = abs_start + value.len();
    }
    result
}

/// Expand a leading `~/` to the home directory
pub fn shellexpand(s: &str) -> PathBuf {
    match s.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_parses() {
        let config = HdiConfig::parse(DEFAULT_CONFIG, env_of(&[])).unwrap();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.providers.groq.base_url, "https://api.groq.com/openai");
        assert!(config.providers.google.api_key.is_empty());
        assert!(config.models.is_empty());
        assert_eq!(config.registry().unwrap().len(), 7);
    }

    #[test]
    fn test_expansion_is_allowlisted() {
        let env = env_of(&[("GOOGLE_API_KEY", "AIza-test-key-123"), ("SECRET", "leak")]);
        let out = expand_env_vars("a = \"${GOOGLE_API_KEY}\"\nb = \"${SECRET}\"", &env);
        assert_eq!(out, "a = \"AIza-test-key-123\"\nb = \"${SECRET}\"");
    }

    #[test]
    fn test_unterminated_placeholder_left_alone() {
        let out = expand_env_vars("a = \"${GOOGLE_API_KEY\"", &env_of(&[]));
        assert_eq!(out, "a = \"${GOOGLE_API_KEY\"");
    }

    #[test]
    fn test_key_fallbacks() {
        let mut config = HdiConfig::parse(DEFAULT_CONFIG, env_of(&[])).unwrap();
        config.apply_key_fallbacks(env_of(&[
            ("GROK_API_KEY", "gsk_fallback_key_123"),
            ("EMERGENT_LLM_KEY", "sk-emergent-key-456"),
        ]));
        assert_eq!(config.providers.groq.api_key, "gsk_fallback_key_123");
        assert_eq!(config.providers.openai.api_key, "sk-emergent-key-456");
        assert_eq!(config.media.openai_api_key, "sk-emergent-key-456");
    }

    #[test]
    fn test_primary_key_wins_over_fallback() {
        let mut config = HdiConfig::parse(
            DEFAULT_CONFIG,
            env_of(&[("GROQ_API_KEY", "gsk_primary_key_789")]),
        )
        .unwrap();
        config.apply_key_fallbacks(env_of(&[("GROK_API_KEY", "gsk_fallback_key_123")]));
        assert_eq!(config.providers.groq.api_key, "gsk_primary_key_789");
    }

    #[test]
    fn test_custom_models() {
        let toml = r#"
[[models]]
id = "riset"
provider = "groq"
model = "llama-3.1-8b-instant"

[[models]]
id = "umum"
provider = "google"
model = "gemini-1.5-pro"
"#;
        let config = HdiConfig::parse(toml, env_of(&[])).unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("riset").provider, ProviderKind::Groq);
        assert_eq!(registry.resolve("umum").provider, ProviderKind::Gemini);
        assert_eq!(registry.resolve("hdi-4").model, "gemini-1.5-flash");
    }

    #[test]
    fn test_duplicate_model_ids_rejected() {
        let toml = r#"
[[models]]
id = "x"
provider = "groq"
model = "a"

[[models]]
id = "x"
provider = "openai"
model = "b"
"#;
        let config = HdiConfig::parse(toml, env_of(&[])).unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let toml = "[[models]]\nid = \"x\"\nprovider = \"anthropic\"\nmodel = \"claude\"\n";
        let config = HdiConfig::parse(toml, env_of(&[])).unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_secrets_masked() {
        let mut config = HdiConfig::parse(DEFAULT_CONFIG, env_of(&[])).unwrap();
        config.providers.openai.api_key = "sk-abcdefghijklmnop".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-abcdefghijklmnop"));

        let shown = toml::to_string_pretty(&config.masked()).unwrap();
        assert!(!shown.contains("sk-abcdefghijklmnop"));
        assert!(shown.contains("sk-...mnop"));
    }

    #[test]
    fn test_load_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let config = HdiConfig::load(&Some(path)).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.providers.openai.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_load_missing_custom_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HdiConfig::load(&Some(dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_shellexpand() {
        assert_eq!(shellexpand("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
        assert!(!shellexpand("~/x.json").starts_with("~"));
    }
}
