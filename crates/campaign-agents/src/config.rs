//! Studio configuration.
//!
//! Precedence, highest first:
//!
//! | Source                   | Example                                  |
//! |--------------------------|------------------------------------------|
//! | environment              | `STUDIO_LANGUAGE=en`, `GEMINI_API_KEY=…` |
//! | TOML file (`--config`)   | `language = "zh-TW"`                     |
//! | built-in defaults        | `StudioConfig::default()`                |
//!
//! Language and credentials are explicit values on [`StudioConfig`] and are
//! handed to the pipeline at construction; nothing below reads them from the
//! environment later.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use orchestration::{
    ClassifiedError, ErrorKind, FileStore, KeyValueStore, Language, RetryPolicy, StoreError,
    DEFAULT_BASE_URL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Key under which a user-supplied API key is kept in the key-value store.
pub const API_KEY_STORE_KEY: &str = "gemini_api_key";

/// Cache capacity used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: '{value}' ({reason})")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model for the JSON-producing stages.
    pub text: String,
    /// Model for image generation.
    pub image: String,
    pub image_size: String,
    /// Thinking budget for planner, analyst and strategist.
    pub thinking_budget: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: "gemini-2.5-flash".into(),
            image: "gemini-3-pro-image-preview".into(),
            image_size: "1K".into(),
            thinking_budget: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub text: RetryPolicy,
    pub image: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            text: RetryPolicy::text(),
            image: RetryPolicy::image(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Directory for the file-backed store (cache entries and saved API key).
    pub dir: PathBuf,
    pub retention_days: i64,
    pub capacity_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(".campaign-cache"),
            retention_days: 7,
            capacity_bytes: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// API key from config or environment. A key saved in the store wins.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub language: Language,
    pub base_url: String,
    pub timeout_secs: u64,
    pub models: ModelConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: Language::default(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            models: ModelConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Defaults, then the TOML file if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(key) = ["STUDIO_API_KEY", "GEMINI_API_KEY", "API_KEY"]
            .iter()
            .find_map(|var| get(var))
        {
            self.api_key = Some(key);
        }
        if let Some(value) = get("STUDIO_LANGUAGE") {
            self.language = value.parse().map_err(|reason| ConfigError::Env {
                var: "STUDIO_LANGUAGE",
                value,
                reason,
            })?;
        }
        if let Some(value) = get("STUDIO_BASE_URL") {
            self.base_url = value;
        }
        if let Some(value) = get("STUDIO_TEXT_MODEL") {
            self.models.text = value;
        }
        if let Some(value) = get("STUDIO_IMAGE_MODEL") {
            self.models.image = value;
        }
        if let Some(value) = get("STUDIO_CACHE_DIR") {
            self.cache.dir = PathBuf::from(value);
        }
        if let Some(value) = get("STUDIO_CACHE_ENABLED") {
            self.cache.enabled = parse_env("STUDIO_CACHE_ENABLED", value)?;
        }
        if let Some(value) = get("STUDIO_CACHE_RETENTION_DAYS") {
            self.cache.retention_days = parse_env("STUDIO_CACHE_RETENTION_DAYS", value)?;
        }
        if let Some(value) = get("STUDIO_TIMEOUT_SECS") {
            self.timeout_secs = parse_env("STUDIO_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = get("STUDIO_THINKING_BUDGET") {
            self.models.thinking_budget = parse_env("STUDIO_THINKING_BUDGET", value)?;
        }
        if let Some(value) = get("STUDIO_TEXT_MAX_RETRIES") {
            self.retry.text.max_retries = parse_env("STUDIO_TEXT_MAX_RETRIES", value)?;
        }
        if let Some(value) = get("STUDIO_IMAGE_MAX_RETRIES") {
            self.retry.image.max_retries = parse_env("STUDIO_IMAGE_MAX_RETRIES", value)?;
        }
        Ok(())
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.models.text.trim().is_empty() || self.models.image.trim().is_empty() {
            return Err(ConfigError::Invalid("model names must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".into()));
        }
        self.retention()?;
        self.retry
            .text
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("retry.text: {e}")))?;
        self.retry
            .image
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("retry.image: {e}")))?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache retention as a duration; must be positive and representable.
    pub fn retention(&self) -> Result<chrono::Duration, ConfigError> {
        let days = self.cache.retention_days;
        if days <= 0 {
            return Err(ConfigError::Invalid(format!("cache.retention_days must be > 0, got {days}")));
        }
        chrono::Duration::try_days(days)
            .ok_or_else(|| ConfigError::Invalid(format!("cache.retention_days is out of range, got {days}")))
    }

    /// Open the file-backed store under `cache.dir`.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>, StoreError> {
        let store = FileStore::open(&self.cache.dir)?.with_capacity(self.cache.capacity_bytes);
        Ok(Arc::new(store))
    }

    /// Resolve the API key: saved key first, then config/environment.
    pub fn resolve_api_key(&self, store: Option<&dyn KeyValueStore>) -> Result<String, ClassifiedError> {
        let saved = store.and_then(|store| match store.get(API_KEY_STORE_KEY) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "could not read saved API key");
                None
            }
        });

        saved
            .or_else(|| self.api_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| missing_key_error(self.language))
    }
}

fn missing_key_error(language: Language) -> ClassifiedError {
    let user_message = match language {
        Language::ZhTw => "找不到 API 金鑰。請在設定中輸入您的 Gemini API Key。",
        Language::En => "No API key found. Save your Gemini API key or set GEMINI_API_KEY.",
    };
    ClassifiedError::new(ErrorKind::Auth, "API key not found", language).with_user_message(user_message)
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        reason: e.to_string(),
        var,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestration::MemoryStore;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_service_conventions() {
        let config = StudioConfig::default();
        assert_eq!(config.language, Language::ZhTw);
        assert_eq!(config.models.text, "gemini-2.5-flash");
        assert_eq!(config.models.image, "gemini-3-pro-image-preview");
        assert_eq!(config.retry.text, RetryPolicy::text());
        assert_eq!(config.retry.image, RetryPolicy::image());
        assert_eq!(config.cache.retention_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = StudioConfig::default();
        config
            .apply_overrides(env(&[
                ("STUDIO_LANGUAGE", "en"),
                ("GEMINI_API_KEY", "AIzaFromEnv"),
                ("STUDIO_TEXT_MAX_RETRIES", "1"),
            ]))
            .unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.api_key.as_deref(), Some("AIzaFromEnv"));
        assert_eq!(config.retry.text.max_retries, 1);
    }

    #[test]
    fn studio_key_beats_generic_key() {
        let mut config = StudioConfig::default();
        config
            .apply_overrides(env(&[("API_KEY", "generic"), ("STUDIO_API_KEY", "studio")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("studio"));
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = StudioConfig::default();
        let err = config
            .apply_overrides(env(&[("STUDIO_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("STUDIO_TIMEOUT_SECS"));
    }

    #[test]
    fn toml_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.toml");
        std::fs::write(
            &path,
            r#"
language = "en"

[models]
text = "gemini-custom"

[retry.image]
max_retries = 2
initial_delay_ms = 100
backoff_factor = 3.0
"#,
        )
        .unwrap();
        let config = StudioConfig::from_file(&path).unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.models.text, "gemini-custom");
        assert_eq!(config.models.image, "gemini-3-pro-image-preview");
        assert_eq!(config.retry.image.schedule(), vec![100, 300]);
        assert_eq!(config.retry.text, RetryPolicy::text());
    }

    #[test]
    fn validate_rejects_nonsense() {
        let mut config = StudioConfig::default();
        config.retry.text.backoff_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.cache.retention_days = 0;
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.cache.retention_days = 200_000_000_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(config.retention().is_err());
    }

    #[test]
    fn oversized_retention_from_env_is_an_error() {
        let mut config = StudioConfig::default();
        config
            .apply_overrides(env(&[("STUDIO_CACHE_RETENTION_DAYS", "200000000000000")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn saved_key_wins_over_config() {
        let store = MemoryStore::new();
        store.set(API_KEY_STORE_KEY, "AIzaSaved").unwrap();
        let config = StudioConfig {
            api_key: Some("AIzaConfig".into()),
            ..StudioConfig::default()
        };
        assert_eq!(config.resolve_api_key(Some(&store)).unwrap(), "AIzaSaved");
        assert_eq!(config.resolve_api_key(None).unwrap(), "AIzaConfig");
    }

    #[test]
    fn missing_key_is_auth_error() {
        let err = StudioConfig::default().resolve_api_key(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!err.retryable());
        assert!(err.user_message().contains("API"));
    }
}
