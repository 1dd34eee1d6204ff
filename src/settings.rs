//! Settings store: gateway config and saved sessions on disk.
//!
//! Layout under the config directory:
//!
//! ```text
//! <root>/config.json            provider, model, base_url, temperature, max_tokens
//! <root>/sessions/<name>.json   PromptSession snapshots
//! ```
//!
//! The API key is never written; it is read from the provider's environment
//! variable on every run.
use crate::model::{LlmConfig, PromptSession, Provider, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the config directory.
pub const HOME_ENV: &str = "PROMPTBUSTER_HOME";
const DEFAULT_DIR_NAME: &str = ".promptbuster";
const CONFIG_FILE: &str = "config.json";
const SESSIONS_DIR: &str = "sessions";

/// Persisted form of [`LlmConfig`], minus the API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredConfig {
    provider: String,
    model: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl From<&LlmConfig> for StoredConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider_tag().to_string(),
            model: config.model().to_string(),
            base_url: config.base_url().map(str::to_string),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
        }
    }
}

impl From<StoredConfig> for LlmConfig {
    fn from(stored: StoredConfig) -> Self {
        LlmConfig::new(stored.provider, stored.model)
            .with_base_url(stored.base_url)
            .with_temperature(stored.temperature)
            .with_max_tokens(stored.max_tokens)
    }
}

/// Handle over one config directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
}

impl SettingsStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve the config directory: explicit path, `$PROMPTBUSTER_HOME`, then
    /// `~/.promptbuster`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path.to_path_buf()));
        }
        if let Some(path) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::new(PathBuf::from(path)));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            anyhow!("cannot locate home directory (set {HOME_ENV} or pass --config-dir)")
        })?;
        Ok(Self::new(home.join(DEFAULT_DIR_NAME)))
    }

    /// Create the config directory if it does not exist yet.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create config dir {}", self.root.display()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub fn session_path(&self, name: &str) -> Result<PathBuf> {
        validate_session_name(name)?;
        Ok(self.sessions_dir().join(format!("{name}.json")))
    }

    /// Persist the gateway config without its API key.
    pub fn save_config(&self, config: &LlmConfig) -> Result<()> {
        config.validate().context("refusing to save invalid config")?;
        self.init()?;
        let path = self.config_path();
        let text = serde_json::to_string_pretty(&StoredConfig::from(config))
            .context("serialize config")?;
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Load the stored config; `Ok(None)` when none has been saved.
    ///
    /// A present but unreadable or invalid file is an error, not a default.
    pub fn load_config(&self) -> Result<Option<LlmConfig>> {
        let path = self.config_path();
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let stored: StoredConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config JSON {}", path.display()))?;
        let config = LlmConfig::from(stored);
        config
            .validate()
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn save_session(&self, name: &str, session: &PromptSession) -> Result<()> {
        let path = self.session_path(name)?;
        let dir = self.sessions_dir();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let text = serde_json::to_string_pretty(session).context("serialize session")?;
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        tracing::debug!(session = name, path = %path.display(), "saved session");
        Ok(())
    }

    /// Load a named session; `Ok(None)` when it does not exist.
    pub fn load_session(&self, name: &str) -> Result<Option<PromptSession>> {
        let path = self.session_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let session = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse session JSON {}", path.display()))?;
        Ok(Some(session))
    }

    /// Names of saved sessions, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let dir = self.sessions_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a saved session; returns whether one existed.
    pub fn delete_session(&self, name: &str) -> Result<bool> {
        let path = self.session_path(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        Ok(true)
    }
}

/// Read the provider's API key from its environment variable.
pub fn api_key_from_env(provider: Provider) -> Option<String> {
    api_key_with(provider, |name| env::var(name).ok())
}

fn api_key_with(provider: Provider, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    provider
        .api_key_env()
        .and_then(lookup)
        .filter(|key| !key.trim().is_empty())
}

fn validate_session_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("session name must be non-empty"));
    }
    if trimmed != name
        || name.contains(['/', '\\'])
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(anyhow!(
            "session name must be a plain file name without separators or '..' (got {name:?})"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
