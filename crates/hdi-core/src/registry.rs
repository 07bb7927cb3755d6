//! Model registry: public model id -> provider binding

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::providers::ProviderKind;

/// Fixed mapping of a public model id to a vendor and concrete model name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBinding {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub description: String,
}

impl ProviderBinding {
    pub fn new(provider: ProviderKind, model: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate model id in registry: {0}")]
    DuplicateModel(String),
}

/// Read-only after construction. Unknown ids resolve to the default binding.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    order: Vec<String>,
    bindings: HashMap<String, ProviderBinding>,
    default: ProviderBinding,
}

impl ModelRegistry {
    /// The registry served when config does not declare `[[models]]`
    pub fn builtin() -> Self {
        let entries = [
            ("hdi-4", ProviderKind::Gemini, "gemini-1.5-flash", "Model utama ChatHDI (Gemini 1.5 Flash)"),
            ("hdi-4-mini", ProviderKind::Gemini, "gemini-1.5-flash", "Versi ringan untuk respons cepat"),
            ("hdi-code", ProviderKind::Gemini, "gemini-1.5-flash", "Asisten pemrograman dan teknis"),
            ("hdi-vision", ProviderKind::Gemini, "gemini-1.5-pro", "Analisis gambar dan dokumen"),
            ("hdi-grok", ProviderKind::Groq, "llama-3.3-70b-versatile", "Llama 3.3 70B melalui Groq"),
            ("hdi-grok-mini", ProviderKind::Groq, "llama-3.1-8b-instant", "Llama 3.1 8B instan melalui Groq"),
            ("hdi-gpt", ProviderKind::OpenAi, "gpt-4o-mini", "GPT-4o mini melalui OpenAI"),
        ];

        let bindings = entries
            .into_iter()
            .map(|(id, provider, model, desc)| (id.to_string(), ProviderBinding::new(provider, model, desc)));

        // Built-in ids are distinct literals
        match Self::from_bindings(Self::builtin_default(), bindings) {
            Ok(registry) => registry,
            Err(_) => unreachable!("built-in registry has unique ids"),
        }
    }

    fn builtin_default() -> ProviderBinding {
        ProviderBinding::new(
            ProviderKind::Gemini,
            ProviderKind::Gemini.default_model(),
            "Default model",
        )
    }

    /// Build from an ordered list of `(model_id, binding)`; duplicate ids are fatal
    pub fn from_bindings<I>(default: ProviderBinding, entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (String, ProviderBinding)>,
    {
        let mut order = Vec::new();
        let mut bindings = HashMap::new();

        for (id, binding) in entries {
            if bindings.contains_key(&id) {
                return Err(RegistryError::DuplicateModel(id));
            }
            order.push(id.clone());
            bindings.insert(id, binding);
        }

        Ok(Self {
            order,
            bindings,
            default,
        })
    }

    /// Look up `model_id`, falling back to the default binding
    pub fn resolve(&self, model_id: &str) -> &ProviderBinding {
        self.bindings.get(model_id).unwrap_or(&self.default)
    }

    /// Exact lookup without the default fallback
    pub fn get(&self, model_id: &str) -> Option<&ProviderBinding> {
        self.bindings.get(model_id)
    }

    /// Bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderBinding)> {
        self.order
            .iter()
            .filter_map(|id| self.bindings.get(id).map(|b| (id.as_str(), b)))
    }

    pub fn default_binding(&self) -> &ProviderBinding {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bindings() {
        let reg = ModelRegistry::builtin();
        assert_eq!(reg.len(), 7);
        let b = reg.resolve("hdi-grok");
        assert_eq!(b.provider, ProviderKind::Groq);
        assert_eq!(b.model, "llama-3.3-70b-versatile");
        assert_eq!(reg.resolve("hdi-vision").model, "gemini-1.5-pro");
        assert_eq!(reg.resolve("hdi-gpt").provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_unknown_id_resolves_to_default() {
        let reg = ModelRegistry::builtin();
        for id in ["", "gpt-5", "hdi-image", "HDI-4"] {
            let b = reg.resolve(id);
            assert_eq!(b.provider, ProviderKind::Gemini);
            assert_eq!(b.model, "gemini-1.5-flash");
        }
        assert!(reg.get("gpt-5").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let entries = vec![
            ("a".to_string(), ProviderBinding::new(ProviderKind::Groq, "m1", "")),
            ("a".to_string(), ProviderBinding::new(ProviderKind::OpenAi, "m2", "")),
        ];
        let err = ModelRegistry::from_bindings(ModelRegistry::builtin_default(), entries).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModel("a".to_string()));
    }

    #[test]
    fn test_iter_keeps_declaration_order() {
        let reg = ModelRegistry::builtin();
        let ids: Vec<&str> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(ids.first(), Some(&"hdi-4"));
        assert_eq!(ids.last(), Some(&"hdi-gpt"));
    }
}
