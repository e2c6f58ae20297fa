//! Configuration system (layered: defaults > TOML file > env > explicit overrides).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FinanceError, Result};
use crate::models::{LanguageModel, DEFAULT_MODEL};
use crate::types::GenerationSettings;

/// Default ceiling on tool rounds per user turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

const ENV_API_KEYS: [(&str, &str); 3] = [
    ("GROQ_API_KEY", "groq"),
    ("OPENAI_API_KEY", "openai"),
    ("OPENAI_COMPAT_API_KEY", "openai-compatible"),
];

const ENV_BASE_URLS: [(&str, &str); 4] = [
    ("GROQ_BASE_URL", "groq"),
    ("OPENAI_BASE_URL", "openai"),
    ("OPENAI_COMPAT_BASE_URL", "openai-compatible"),
    ("YAHOO_FINANCE_BASE_URL", "yahoo"),
];

/// Agent configuration.
///
/// Resolution order, later layers winning:
/// 1. Built-in defaults
/// 2. TOML config file (explicit path, or the platform config dir)
/// 3. Environment variables (a `.env` file is loaded first when present)
/// 4. Explicit setters / CLI flags
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model selector, `provider:model_id`.
    pub model: String,
    pub max_iterations: usize,
    pub decision_timeout_ms: Option<u64>,
    pub tool_timeout_ms: Option<u64>,
    /// Run the tool calls of one decision concurrently.
    pub parallel_tools: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub api_keys: HashMap<String, String>,
    pub base_urls: HashMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            decision_timeout_ms: None,
            tool_timeout_ms: Some(30_000),
            parallel_tools: false,
            temperature: None,
            max_tokens: None,
            api_keys: HashMap::new(),
            base_urls: HashMap::new(),
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&String> = self.api_keys.keys().collect();
        providers.sort();
        f.debug_struct("AgentConfig")
            .field("model", &self.model)
            .field("max_iterations", &self.max_iterations)
            .field("decision_timeout_ms", &self.decision_timeout_ms)
            .field("tool_timeout_ms", &self.tool_timeout_ms)
            .field("parallel_tools", &self.parallel_tools)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_keys", &providers)
            .field("base_urls", &self.base_urls)
            .finish()
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| FinanceError::Configuration(format!("invalid config file: {e}")))
    }

    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Full layered load. An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.is_file() => Self::from_file(&default)?,
                _ => Self::new(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/finance-agent/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "finance-agent")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (env_var, provider) in ENV_API_KEYS {
            if let Some(key) = lookup(env_var).filter(|v| !v.is_empty()) {
                self.set_api_key(provider, key);
            }
        }
        for (env_var, provider) in ENV_BASE_URLS {
            if let Some(url) = lookup(env_var).filter(|v| !v.is_empty()) {
                self.set_base_url(provider, url);
            }
        }
        if let Some(model) = lookup("FINANCE_AGENT_MODEL").filter(|v| !v.is_empty()) {
            self.model = model;
        }
        if let Some(max) = lookup("FINANCE_AGENT_MAX_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.max_iterations = max;
        }
    }

    pub fn set_api_key(&mut self, provider: &str, key: impl Into<String>) {
        self.api_keys.insert(provider.to_string(), key.into());
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.get(provider).cloned()
    }

    pub fn set_base_url(&mut self, provider: &str, url: impl Into<String>) {
        self.base_urls.insert(provider.to_string(), url.into());
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.get(provider).cloned()
    }

    /// Check if a provider has credentials configured.
    pub fn has_credentials(&self, provider: &str) -> bool {
        self.api_keys.contains_key(provider)
    }

    pub fn language_model(&self) -> Result<LanguageModel> {
        self.model.parse()
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            parallel_tool_calls: Some(true),
            ..Default::default()
        }
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_ms.map(Duration::from_millis)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the agent cannot run with.
    ///
    /// A `max_iterations` of 0 is accepted: the model may still answer
    /// directly but any tool request ends the run.
    pub fn validate(&self) -> Result<()> {
        self.language_model()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overlay_sets_keys_urls_and_model() {
        let mut config = AgentConfig::new();
        let env: HashMap<&str, &str> = [
            ("GROQ_API_KEY", "gsk-test"),
            ("YAHOO_FINANCE_BASE_URL", "http://127.0.0.1:9000"),
            ("FINANCE_AGENT_MODEL", "openai:gpt-4o-mini"),
            ("FINANCE_AGENT_MAX_ITERATIONS", "4"),
            ("OPENAI_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.get_api_key("groq").as_deref(), Some("gsk-test"));
        assert_eq!(config.get_base_url("yahoo").as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.model, "openai:gpt-4o-mini");
        assert_eq!(config.max_iterations, 4);
        assert!(!config.has_credentials("openai"));
    }

    #[test]
    fn unparsable_iteration_override_is_ignored() {
        let mut config = AgentConfig::new();
        config.apply_env(|k| (k == "FINANCE_AGENT_MAX_ITERATIONS").then(|| "many".to_string()));
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn toml_fills_only_given_fields() {
        let config = AgentConfig::from_toml_str(
            r#"
            max_iterations = 3
            parallel_tools = true

            [base_urls]
            groq = "http://localhost:1234/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 3);
        assert!(config.parallel_tools);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.tool_timeout_ms, Some(30_000));
        assert_eq!(config.get_base_url("groq").as_deref(), Some("http://localhost:1234/v1"));
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = AgentConfig::from_toml_str("max_iterations = \"ten\"").unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_key_values() {
        let mut config = AgentConfig::new();
        config.set_api_key("groq", "super-secret");
        let printed = format!("{config:?}");
        assert!(printed.contains("groq"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn validate_accepts_zero_iterations_and_rejects_bad_model() {
        let mut config = AgentConfig::new();
        assert!(config.validate().is_ok());
        config.max_iterations = 0;
        assert!(config.validate().is_ok());
        config.model = "nonsense".into();
        assert!(config.validate().is_err());
    }
}
