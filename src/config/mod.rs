//! Configuration (layered: code > env > config file > defaults).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{AgentRole, Model, ModelCatalog};

const DEFAULT_AUGMENT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Model assignment for one agent role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            reasoning_effort: None,
        }
    }
}

/// Prompt augmentation budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AugmentationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_augment_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AugmentationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_AUGMENT_TIMEOUT_MS,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_augment_timeout_ms() -> u64 {
    DEFAULT_AUGMENT_TIMEOUT_MS
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// Engine configuration.
///
/// ```toml
/// max_iterations = 50
///
/// [agents.coder]
/// model = "claude-4-sonnet"
/// max_tokens = 8000
///
/// [augmentation]
/// enabled = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_agents")]
    pub agents: HashMap<AgentRole, AgentSettings>,
    #[serde(default)]
    pub augmentation: AugmentationSettings,
    /// Upper bound on stream/dispatch rounds within one run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Extra catalog entries, merged over the built-in models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

fn default_agents() -> HashMap<AgentRole, AgentSettings> {
    HashMap::from([
        (AgentRole::Coder, AgentSettings::new("claude-4-sonnet")),
        (AgentRole::Summarizer, AgentSettings::new("claude-4-sonnet")),
        (AgentRole::Title, AgentSettings::new("claude-3.5-haiku")),
        (AgentRole::Task, AgentSettings::new("claude-3.5-haiku")),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            augmentation: AugmentationSettings::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            models: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// `~/.runloop/config.toml`.
    pub fn default_path() -> PathBuf {
        default_runloop_dir().join("config.toml")
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| EngineError::Configuration(e.to_string()))
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Self::from_toml_str(&raw)
    }

    /// Load the default file, then apply `.env` and environment overrides.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::load(&Self::default_path())?;
        config.apply_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Apply `RUNLOOP_*` overrides from key/value pairs.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "RUNLOOP_CODER_MODEL" => self.set_agent_model(AgentRole::Coder, value),
                "RUNLOOP_SUMMARIZER_MODEL" => self.set_agent_model(AgentRole::Summarizer, value),
                "RUNLOOP_TITLE_MODEL" => self.set_agent_model(AgentRole::Title, value),
                "RUNLOOP_TASK_MODEL" => self.set_agent_model(AgentRole::Task, value),
                "RUNLOOP_AUGMENT" => self.augmentation.enabled = parse_flag(value)?,
                "RUNLOOP_AUGMENT_TIMEOUT_MS" => {
                    self.augmentation.timeout_ms = parse_number("RUNLOOP_AUGMENT_TIMEOUT_MS", value)?
                }
                "RUNLOOP_MAX_ITERATIONS" => {
                    self.max_iterations = parse_number("RUNLOOP_MAX_ITERATIONS", value)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Write as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized =
            toml::to_string(self).map_err(|e| EngineError::Configuration(e.to_string()))?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn agent(&self, role: AgentRole) -> Option<&AgentSettings> {
        self.agents.get(&role)
    }

    /// Point a role at another model, keeping its other settings.
    pub fn set_agent_model(&mut self, role: AgentRole, model: &str) {
        self.agents
            .entry(role)
            .and_modify(|a| a.model = model.to_string())
            .or_insert_with(|| AgentSettings::new(model));
    }

    /// Built-in models plus the ones declared in this config.
    pub fn catalog(&self) -> ModelCatalog {
        let mut catalog = ModelCatalog::builtin();
        for model in &self.models {
            catalog.register(model.clone());
        }
        catalog
    }

    /// Every configured role must name a known model.
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<()> {
        if self.agent(AgentRole::Coder).is_none() {
            return Err(EngineError::Configuration(
                "no model configured for the coder agent".into(),
            ));
        }
        for (role, settings) in &self.agents {
            if catalog.get(&settings.model).is_none() {
                return Err(EngineError::Configuration(format!(
                    "unknown model '{}' for agent {role}",
                    settings.model
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EngineError::Configuration(format!(
            "expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Configuration(format!("{key}: '{value}' is not a number")))
}

fn default_runloop_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".runloop"))
        .unwrap_or_else(|| PathBuf::from(".runloop"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_assign_every_role() {
        let config = EngineConfig::default();
        assert_eq!(config.agent(AgentRole::Coder).unwrap().model, "claude-4-sonnet");
        assert_eq!(config.augmentation.timeout_ms, 15_000);
        assert_eq!(config.max_iterations, 100);
        config.validate(&config.catalog()).unwrap();
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_iterations = 7

            [agents.coder]
            model = "gpt-4o"
            max_tokens = 2000

            [augmentation]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_iterations, 7);
        assert!(!config.augmentation.enabled);
        assert_eq!(config.augmentation.timeout_ms, 15_000);
        let coder = config.agent(AgentRole::Coder).unwrap();
        assert_eq!(coder.model, "gpt-4o");
        assert_eq!(coder.max_tokens, Some(2000));
        assert!(config.agent(AgentRole::Title).is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn save_then_load_preserves_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = EngineConfig::default();
        config.set_agent_model(AgentRole::Summarizer, "gpt-4o-mini");
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides([
                ("RUNLOOP_CODER_MODEL", "gpt-4o"),
                ("RUNLOOP_AUGMENT", "off"),
                ("RUNLOOP_AUGMENT_TIMEOUT_MS", "250"),
                ("UNRELATED", "x"),
            ])
            .unwrap();
        assert_eq!(config.agent(AgentRole::Coder).unwrap().model, "gpt-4o");
        assert!(!config.augmentation.enabled);
        assert_eq!(config.augmentation.timeout_ms, 250);
    }

    #[test]
    fn bad_override_is_configuration_error() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides([("RUNLOOP_MAX_ITERATIONS", "many")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn validate_rejects_unknown_model() {
        let mut config = EngineConfig::default();
        config.set_agent_model(AgentRole::Title, "mystery");
        let err = config.validate(&config.catalog()).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn custom_models_extend_catalog() {
        let config = EngineConfig::from_toml_str(
            r#"
            [agents.coder]
            model = "local-coder"

            [[models]]
            id = "local-coder"
            provider = "ollama"
            name = "Local"
            context_window = 32000
            default_max_tokens = 2048
            pricing = { input_per_m = 0.0, output_per_m = 0.0 }
            "#,
        )
        .unwrap();
        let catalog = config.catalog();
        assert!(catalog.get("local-coder").is_some());
        config.validate(&catalog).unwrap();
    }
}
