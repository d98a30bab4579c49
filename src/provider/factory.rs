//! Provider factory trait for creating ModelProvider instances.

use std::sync::Arc;

use super::ModelProvider;
use crate::config::AgentSettings;
use crate::error::Result;
use crate::models::{AgentRole, Model};

/// Builds providers for an agent role. Used at construction and when a role's
/// model is swapped at runtime.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        role: AgentRole,
        model: &Model,
        settings: &AgentSettings,
    ) -> Result<Arc<dyn ModelProvider>>;
}
