//! Configuration loading and client factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradelens_core::remote::RemoteSettings;
use gradelens_core::statistics::DEFAULT_RECENT_UPLOADS;
use gradelens_core::traits::InferenceClient;

use crate::openai::OpenAiClient;

/// Environment variables that override the configured API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GRADELENS_OPENAI_KEY", "OPENAI_API_KEY"];

/// Remote inference backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InferenceConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default = "default_temperature")]
        temperature: f64,
    },
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceConfig::OpenAI {
                api_key,
                base_url,
                model,
                timeout_secs,
                temperature,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &if api_key.is_empty() { "" } else { "***" })
                .field("base_url", base_url)
                .field("model", model)
                .field("timeout_secs", timeout_secs)
                .field("temperature", temperature)
                .finish(),
        }
    }
}

impl InferenceConfig {
    fn openai_with_key(api_key: String) -> Self {
        InferenceConfig::OpenAI {
            api_key,
            base_url: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            InferenceConfig::OpenAI { api_key, .. } => api_key,
        }
    }

    /// Model parameters for the remote strategies.
    pub fn remote_settings(&self) -> RemoteSettings {
        match self {
            InferenceConfig::OpenAI {
                model,
                timeout_secs,
                temperature,
                ..
            } => RemoteSettings {
                model: model.clone(),
                temperature: *temperature,
                timeout: Duration::from_secs(*timeout_secs),
            },
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f64 {
    0.3
}
fn default_recent_uploads() -> usize {
    DEFAULT_RECENT_UPLOADS
}

/// Settings for the heuristic pipeline and dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seed for the score jitter; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of uploads listed in the teacher overview.
    #[serde(default = "default_recent_uploads")]
    pub recent_uploads_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: None,
            recent_uploads_limit: default_recent_uploads(),
        }
    }
}

/// Top-level gradelens configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradelensConfig {
    /// Remote backend; heuristics only when absent or keyless.
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl GradelensConfig {
    /// Model parameters for the remote strategies (defaults when unconfigured).
    pub fn remote_settings(&self) -> RemoteSettings {
        self.inference
            .as_ref()
            .map(InferenceConfig::remote_settings)
            .unwrap_or_default()
    }

    /// Apply `${VAR}` references and API key overrides using `lookup`.
    fn resolve(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
        {
            match &mut self.inference {
                Some(InferenceConfig::OpenAI { api_key, .. }) => *api_key = key,
                None => self.inference = Some(InferenceConfig::openai_with_key(key)),
            }
        }

        if let Some(InferenceConfig::OpenAI {
            api_key, base_url, ..
        }) = &mut self.inference
        {
            *api_key = resolve_env_vars(api_key, &lookup);
            if let Some(url) = base_url.as_mut() {
                *url = resolve_env_vars(url, &lookup);
            }
        }
        self
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradelens.toml` in the current directory
/// 2. `~/.config/gradelens/config.toml`
///
/// Environment variable overrides: `GRADELENS_OPENAI_KEY`, then `OPENAI_API_KEY`.
pub fn load_config() -> Result<GradelensConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradelensConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("gradelens.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content).with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradelensConfig::default(),
    };

    Ok(config.resolve(|name| std::env::var(name).ok()))
}

/// Parse a TOML config string without applying overrides.
pub fn parse_config(content: &str) -> Result<GradelensConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradelens"))
}

/// Build the configured client, or `None` when no credential is available.
pub fn create_client(config: &GradelensConfig) -> Option<Arc<dyn InferenceClient>> {
    match config.inference.as_ref()? {
        InferenceConfig::OpenAI {
            api_key,
            base_url,
            timeout_secs,
            ..
        } => {
            if api_key.trim().is_empty() {
                tracing::debug!("openai configured without an API key");
                return None;
            }
            let client: Arc<dyn InferenceClient> = Arc::new(OpenAiClient::new(
                api_key,
                base_url.clone(),
                Duration::from_secs(*timeout_secs),
            ));
            Some(client)
        }
    }
}
