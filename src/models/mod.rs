//! Model definitions, agent roles and the model catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::EngineError;
use crate::types::ModelPricing;

/// Which job a configured model serves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRole {
    Coder,
    Summarizer,
    Title,
    Task,
}

/// A backend model and what it costs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub id: String,
    pub provider: String,
    pub name: String,
    /// Identifier sent on the wire, when it differs from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_model: Option<String>,
    pub pricing: ModelPricing,
    pub context_window: u64,
    pub default_max_tokens: u64,
    #[serde(default)]
    pub can_reason: bool,
    #[serde(default)]
    pub supports_attachments: bool,
}

impl Model {
    pub fn api_model(&self) -> &str {
        self.api_model.as_deref().unwrap_or(&self.id)
    }
}

/// Known models, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: HashMap<String, Model>,
}

impl ModelCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the built-in models.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for model in builtin_models() {
            catalog.register(model);
        }
        catalog
    }

    /// Add or replace a model.
    pub fn register(&mut self, model: Model) {
        self.models.insert(model.id.clone(), model);
    }

    pub fn get(&self, id: &str) -> Option<&Model> {
        self.models.get(id)
    }

    /// Look up a model, failing with `ModelNotFound`.
    pub fn resolve(&self, id: &str) -> Result<Model, EngineError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| EngineError::ModelNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }
}

fn builtin_models() -> Vec<Model> {
    vec![
        Model {
            id: "claude-4-sonnet".into(),
            provider: "anthropic".into(),
            name: "Claude 4 Sonnet".into(),
            api_model: Some("claude-sonnet-4-20250514".into()),
            pricing: ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30),
            context_window: 200_000,
            default_max_tokens: 50_000,
            can_reason: true,
            supports_attachments: true,
        },
        Model {
            id: "claude-3.5-haiku".into(),
            provider: "anthropic".into(),
            name: "Claude 3.5 Haiku".into(),
            api_model: Some("claude-3-5-haiku-latest".into()),
            pricing: ModelPricing::new(0.80, 4.0).with_cache(1.0, 0.08),
            context_window: 200_000,
            default_max_tokens: 4_096,
            can_reason: false,
            supports_attachments: true,
        },
        Model {
            id: "gpt-4o".into(),
            provider: "openai".into(),
            name: "GPT 4o".into(),
            api_model: None,
            pricing: ModelPricing::new(2.50, 10.0).with_cache(1.25, 0.0),
            context_window: 128_000,
            default_max_tokens: 4_096,
            can_reason: false,
            supports_attachments: true,
        },
        Model {
            id: "gpt-4o-mini".into(),
            provider: "openai".into(),
            name: "GPT 4o mini".into(),
            api_model: None,
            pricing: ModelPricing::new(0.15, 0.60).with_cache(0.075, 0.0),
            context_window: 128_000,
            default_max_tokens: 4_096,
            can_reason: false,
            supports_attachments: true,
        },
        Model {
            id: "llama-3.3-70b".into(),
            provider: "groq".into(),
            name: "Llama 3.3 70B".into(),
            api_model: Some("llama-3.3-70b-versatile".into()),
            pricing: ModelPricing::new(0.59, 0.79),
            context_window: 128_000,
            default_max_tokens: 4_096,
            can_reason: false,
            supports_attachments: false,
        },
    ]
}
