//! Model router with deterministic provider substitution

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::{ModelRegistry, ProviderBinding};

use super::types::{ChatMessage, ChatTurns, FailureReason, LlmProvider, ProviderFailure, ProviderKind};

/// Which adapter and concrete model will serve a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Binding the model id resolved to
    pub nominal: ProviderBinding,
    pub provider: ProviderKind,
    pub model: String,
    /// True when `provider` differs from the nominal one
    pub substituted: bool,
    /// False when neither the nominal provider nor any alternate is configured
    pub available: bool,
}

/// Outcome of a routed chat call.
///
/// `provider`/`model` name what actually served the request, which may
/// differ from the nominal binding after substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResult {
    pub text: String,
    pub provider: ProviderKind,
    pub model: String,
    pub substituted: bool,
    /// Set when `text` is a failure message rather than a model answer
    pub failure: Option<FailureReason>,
}

/// Routes chat requests to one adapter, substituting an alternate provider
/// when the nominal one has no usable credential.
///
/// Availability is computed once here and never re-checked.
pub struct ModelRouter {
    registry: ModelRegistry,
    providers: BTreeMap<ProviderKind, Arc<dyn LlmProvider>>,
    availability: BTreeMap<ProviderKind, bool>,
    system_prompt: String,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("models", &self.registry.len())
            .field("availability", &self.availability)
            .finish()
    }
}

impl ModelRouter {
    /// Create a router over one adapter per provider kind
    pub fn new(
        registry: ModelRegistry,
        providers: Vec<Arc<dyn LlmProvider>>,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(anyhow!("ModelRouter requires at least one provider"));
        }

        let mut by_kind: BTreeMap<ProviderKind, Arc<dyn LlmProvider>> = BTreeMap::new();
        for provider in providers {
            let kind = provider.kind();
            if by_kind.insert(kind, provider).is_some() {
                return Err(anyhow!("Provider {} registered twice", kind));
            }
        }

        let mut availability = BTreeMap::new();
        for kind in ProviderKind::ALL {
            let configured = by_kind.get(&kind).is_some_and(|p| p.is_configured());
            if configured {
                info!("Provider {} available", kind);
            } else {
                warn!(
                    "Provider {} unavailable ({} not set or invalid)",
                    kind,
                    kind.key_env()
                );
            }
            availability.insert(kind, configured);
        }

        Ok(Self {
            registry,
            providers: by_kind,
            availability,
            system_prompt: system_prompt.into(),
        })
    }

    pub fn is_available(&self, kind: ProviderKind) -> bool {
        self.availability.get(&kind).copied().unwrap_or(false)
    }

    /// Availability flag per provider kind
    pub fn availability(&self) -> &BTreeMap<ProviderKind, bool> {
        &self.availability
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Decide which provider and model serve `model_id`
    pub fn select(&self, model_id: &str) -> Selection {
        let nominal = self.registry.resolve(model_id).clone();

        if self.is_available(nominal.provider) {
            return Selection {
                provider: nominal.provider,
                model: nominal.model.clone(),
                nominal,
                substituted: false,
                available: true,
            };
        }

        if let Some(alt) = nominal
            .provider
            .fallback_order()
            .iter()
            .copied()
            .find(|k| self.is_available(*k))
        {
            return Selection {
                provider: alt,
                model: alt.default_model().to_string(),
                nominal,
                substituted: true,
                available: true,
            };
        }

        Selection {
            provider: nominal.provider,
            model: nominal.model.clone(),
            nominal,
            substituted: false,
            available: false,
        }
    }

    /// Route one chat request. Never fails: provider problems become the text.
    pub async fn chat(&self, messages: &[ChatMessage], model_id: &str) -> ChatResult {
        let selection = self.select(model_id);

        if selection.substituted {
            warn!(
                "Provider {} ({}) unavailable for '{}', using {} ({})",
                selection.nominal.provider,
                selection.nominal.model,
                model_id,
                selection.provider,
                selection.model
            );
        }

        if !selection.available {
            let failure = match self.providers.get(&selection.provider) {
                Some(p) => p.unavailable(),
                None => ProviderFailure::not_configured(selection.provider),
            };
            warn!("No provider available for '{}': {}", model_id, failure.reason);
            return Self::failed(selection, failure);
        }

        let Some(provider) = self.providers.get(&selection.provider) else {
            // Availability is only true for registered adapters
            let failure = ProviderFailure::not_configured(selection.provider);
            return Self::failed(selection, failure);
        };

        let turns = ChatTurns::split(messages);
        debug!(
            "Routing '{}' to {} ({}), history={}",
            model_id,
            selection.provider,
            selection.model,
            turns.history.len()
        );

        match provider
            .send(&selection.model, &self.system_prompt, &turns)
            .await
        {
            Ok(text) => ChatResult {
                text,
                provider: selection.provider,
                model: selection.model,
                substituted: selection.substituted,
                failure: None,
            },
            Err(failure) => Self::failed(selection, failure),
        }
    }

    fn failed(selection: Selection, failure: ProviderFailure) -> ChatResult {
        ChatResult {
            text: failure.message,
            provider: selection.provider,
            model: selection.model,
            substituted: selection.substituted,
            failure: Some(failure.reason),
        }
    }
}
