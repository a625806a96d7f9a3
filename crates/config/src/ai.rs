// AI configuration and secrets management
//
// API keys are looked up in:
// 1. System keychain (preferred)
// 2. Environment variables (OPENAI_API_KEY, ANTHROPIC_API_KEY, ...)
//
// Keys are NEVER stored in settings.toml

use std::time::Duration;

use crate::error::ConfigError;
use crate::settings::{AIProvider, AISettings};

/// Service name for keychain storage
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "conseil";

/// Template value shipped in sample environment files; never a real key.
const PLACEHOLDER_KEY: &str = "your-api-key-here";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Key retrieved from system keychain
    Keychain,
    /// Key retrieved from environment variable
    Environment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone, PartialEq)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

impl KeyLookup {
    pub fn missing() -> Self {
        Self {
            key: None,
            source: KeySource::None,
        }
    }
}

/// Get the keychain account name for a provider
#[cfg(feature = "keychain")]
fn keychain_account(provider: AIProvider) -> String {
    format!("ai/{}", provider.name())
}

fn usable_key(key: String) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || key == PLACEHOLDER_KEY {
        None
    } else {
        Some(key.to_string())
    }
}

/// Look the key up in the environment only, through `lookup`.
pub fn env_api_key<F>(provider: AIProvider, lookup: F) -> KeyLookup
where
    F: Fn(&str) -> Option<String>,
{
    provider
        .key_env_var()
        .and_then(|var| lookup(var))
        .and_then(usable_key)
        .map(|key| KeyLookup {
            key: Some(key),
            source: KeySource::Environment,
        })
        .unwrap_or_else(KeyLookup::missing)
}

/// Get an API key for the specified provider
///
/// Checks in order:
/// 1. System keychain
/// 2. Environment variable (OPENAI_API_KEY, etc.)
pub fn get_api_key(provider: AIProvider) -> KeyLookup {
    // Try keychain first
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Some(key) = entry.get_password().ok().and_then(usable_key) {
                return KeyLookup {
                    key: Some(key),
                    source: KeySource::Keychain,
                };
            }
        }
    }

    // Fall back to environment variable
    env_api_key(provider, |name| std::env::var(name).ok())
}

/// Store an API key in the system keychain
#[cfg(feature = "keychain")]
pub fn set_api_key(provider: AIProvider, key: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider))
        .map_err(|e| ConfigError::Keychain(format!("failed to create entry: {e}")))?;

    entry
        .set_password(key.trim())
        .map_err(|e| ConfigError::Keychain(format!("failed to store key: {e}")))
}

#[cfg(not(feature = "keychain"))]
pub fn set_api_key(provider: AIProvider, _key: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Keychain(format!(
        "keychain support not enabled; set {} instead",
        provider.key_env_var().unwrap_or("the provider key variable")
    )))
}

/// Delete an API key from the system keychain
#[cfg(feature = "keychain")]
pub fn delete_api_key(provider: AIProvider) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider))
        .map_err(|e| ConfigError::Keychain(format!("failed to access entry: {e}")))?;

    entry
        .delete_credential()
        .map_err(|e| ConfigError::Keychain(format!("failed to delete key: {e}")))
}

#[cfg(not(feature = "keychain"))]
pub fn delete_api_key(_provider: AIProvider) -> Result<(), ConfigError> {
    Err(ConfigError::Keychain("keychain support not enabled".into()))
}

// ============================================================================
// Resolved AI Configuration (single source of truth)
// ============================================================================

/// Status of the AI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIConfigStatus {
    /// AI is disabled (provider = None)
    Disabled,
    /// Provider, model and credential are all usable
    Ready,
    /// Provider needs an API key and none was found
    MissingKey,
    /// Model is not offered by the provider
    UnknownModel,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
            Self::UnknownModel => "unknown_model",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// The effective AI configuration, fully resolved from settings and secrets.
#[derive(Debug, Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    /// Effective model (resolved from settings or provider default)
    pub model: String,
    /// Base URL for the Local provider (resolved with default)
    pub base_url: Option<String>,
    /// API key (if available). Optional for Local
    pub api_key: Option<String>,
    pub key_source: KeySource,
    pub anonymize: bool,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub status: AIConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

impl ResolvedAIConfig {
    /// Resolve with the keychain + environment key lookup.
    pub fn from_settings(settings: &AISettings) -> Self {
        Self::from_settings_with(settings, get_api_key)
    }

    /// Resolve with an explicit key lookup.
    pub fn from_settings_with<F>(settings: &AISettings, key_lookup: F) -> Self
    where
        F: Fn(AIProvider) -> KeyLookup,
    {
        let provider = settings.provider;

        let mut resolved = Self {
            provider,
            model: settings.effective_model().to_string(),
            base_url: matches!(provider, AIProvider::Local)
                .then(|| settings.effective_base_url().to_string()),
            api_key: None,
            key_source: KeySource::None,
            anonymize: settings.anonymize,
            max_attempts: settings.max_attempts.max(1),
            retry_base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            status: AIConfigStatus::Ready,
            blocking_reason: None,
        };

        // If disabled, return early
        if !provider.is_enabled() {
            resolved.model.clear();
            resolved.status = AIConfigStatus::Disabled;
            return resolved;
        }

        let lookup = key_lookup(provider);
        resolved.api_key = lookup.key;
        resolved.key_source = lookup.source;

        if provider.needs_api_key() && resolved.api_key.is_none() {
            resolved.status = AIConfigStatus::MissingKey;
            resolved.blocking_reason = Some(format!(
                "No API key found for {}. Set via keychain or {}",
                provider.display_name(),
                provider.key_env_var().unwrap_or_default()
            ));
        } else if !provider.accepts_model(&resolved.model) {
            resolved.status = AIConfigStatus::UnknownModel;
            resolved.blocking_reason = Some(format!(
                "Model '{}' is not available for {}",
                resolved.model,
                provider.display_name()
            ));
        }

        resolved
    }

    /// Load settings and resolve in one call (convenience method)
    pub fn load() -> Self {
        let settings = crate::settings::Settings::load();
        Self::from_settings(&settings.ai)
    }

    /// Provider display name
    pub fn provider_name(&self) -> &'static str {
        self.provider.display_name()
    }

    /// Local check of the resolved configuration; no network access.
    pub fn validate_config(&self) -> ValidationResult {
        match self.status {
            AIConfigStatus::Disabled => ValidationResult::Skipped("AI is disabled".to_string()),
            AIConfigStatus::MissingKey | AIConfigStatus::UnknownModel => ValidationResult::Invalid(
                self.blocking_reason
                    .clone()
                    .unwrap_or_else(|| "Configuration error".to_string()),
            ),
            AIConfigStatus::Ready => match (self.provider, &self.api_key) {
                (AIProvider::Local, _) => ValidationResult::Valid(format!(
                    "{} at {}",
                    self.model,
                    self.base_url.as_deref().unwrap_or_default()
                )),
                (_, Some(_)) => ValidationResult::Valid(format!(
                    "API key present ({}), model {}",
                    self.key_source.as_str(),
                    self.model
                )),
                (_, None) => ValidationResult::Invalid("No API key configured".to_string()),
            },
        }
    }
}

// ============================================================================
// Configuration Validation
// ============================================================================

/// Result of configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Configuration is valid
    Valid(String),
    /// Configuration has issues
    Invalid(String),
    /// Validation was skipped (AI disabled)
    Skipped(String),
}

impl ValidationResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Valid(msg) => msg,
            Self::Invalid(msg) => msg,
            Self::Skipped(msg) => msg,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Which providers are usable with the credentials at hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOverview {
    pub providers_with_keys: Vec<AIProvider>,
    pub enabled_provider: Option<AIProvider>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProviderOverview {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Survey every provider. Local always counts as configured.
pub fn provider_overview<F>(settings: &AISettings, key_lookup: F) -> ProviderOverview
where
    F: Fn(AIProvider) -> KeyLookup,
{
    let providers_with_keys: Vec<AIProvider> = AIProvider::ENABLED
        .into_iter()
        .filter(|p| !p.needs_api_key() || key_lookup(*p).key.is_some())
        .collect();

    let mut overview = ProviderOverview {
        enabled_provider: None,
        errors: Vec::new(),
        warnings: Vec::new(),
        providers_with_keys,
    };

    if !settings.provider.is_enabled() {
        overview.warnings.push("No active AI provider configured".to_string());
    } else if overview.providers_with_keys.contains(&settings.provider) {
        overview.enabled_provider = Some(settings.provider);
    } else {
        overview
            .errors
            .push(format!("No API key found for {}", settings.provider.display_name()));
    }

    overview
}
