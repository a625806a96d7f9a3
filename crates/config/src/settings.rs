// Application settings
// Loaded from ~/.config/conseil/settings.toml, overridable from the environment

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use conseil_recon::SourceLayout;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default endpoint of the local (Ollama-compatible) provider.
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434";

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// AI features disabled (default)
    #[default]
    None,
    /// OpenAI API
    #[serde(rename = "openai")]
    OpenAI,
    /// Anthropic API
    Anthropic,
    /// Google Gemini API
    Gemini,
    /// Local model via an OpenAI-compatible server (Ollama)
    Local,
}

impl AIProvider {
    pub const ENABLED: [AIProvider; 4] = [
        AIProvider::OpenAI,
        AIProvider::Anthropic,
        AIProvider::Gemini,
        AIProvider::Local,
    ];

    /// Returns true if AI features are enabled
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    /// Identifier used in settings files and environment variables
    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::OpenAI => "openai",
            AIProvider::Anthropic => "anthropic",
            AIProvider::Gemini => "gemini",
            AIProvider::Local => "local",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AIProvider::None => "Disabled",
            AIProvider::OpenAI => "OpenAI",
            AIProvider::Anthropic => "Anthropic",
            AIProvider::Gemini => "Google Gemini",
            AIProvider::Local => "Local (Ollama)",
        }
    }

    /// Returns the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::OpenAI => "gpt-4o-mini-2024-07-18",
            AIProvider::Anthropic => "claude-3-5-haiku-20241022",
            AIProvider::Gemini => "gemini-1.5-flash",
            AIProvider::Local => "llama3.2",
        }
    }

    /// Models offered for this provider
    pub fn available_models(&self) -> &'static [&'static str] {
        match self {
            AIProvider::None => &[],
            AIProvider::OpenAI => &[
                "gpt-4o",
                "gpt-4o-mini",
                "gpt-4o-mini-2024-07-18",
                "gpt-4-turbo",
                "gpt-4",
                "gpt-3.5-turbo",
                "gpt-3.5-turbo-16k",
                "o3-mini-2025-01-31",
            ],
            AIProvider::Anthropic => &[
                "claude-3-5-sonnet-20241022",
                "claude-3-5-haiku-20241022",
                "claude-3-opus-20240229",
                "claude-3-sonnet-20240229",
                "claude-3-haiku-20240307",
            ],
            AIProvider::Gemini => &[
                "gemini-2.0-flash-exp",
                "gemini-1.5-pro",
                "gemini-1.5-flash",
                "gemini-1.0-pro",
            ],
            AIProvider::Local => &[
                "llama3.2",
                "llama3.1",
                "llama3",
                "qwen2.5",
                "codellama",
                "mistral",
                "phi3",
                "gemma2",
                "custom-model",
            ],
        }
    }

    /// A local server can host any model, so its list is only a suggestion.
    pub fn accepts_model(&self, model: &str) -> bool {
        match self {
            AIProvider::None => false,
            AIProvider::Local => !model.trim().is_empty(),
            _ => self.available_models().contains(&model),
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self, AIProvider::OpenAI | AIProvider::Anthropic | AIProvider::Gemini)
    }

    /// Environment variable holding the API key
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            AIProvider::None => None,
            AIProvider::OpenAI => Some("OPENAI_API_KEY"),
            AIProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            AIProvider::Gemini => Some("GOOGLE_API_KEY"),
            AIProvider::Local => Some("LOCAL_API_KEY"),
        }
    }

    /// Environment variable overriding the model
    pub fn model_env_var(&self) -> Option<&'static str> {
        match self {
            AIProvider::None => None,
            AIProvider::OpenAI => Some("OPENAI_MODEL"),
            AIProvider::Anthropic => Some("ANTHROPIC_MODEL"),
            AIProvider::Gemini => Some("GEMINI_MODEL"),
            AIProvider::Local => Some("LOCAL_MODEL"),
        }
    }
}

impl fmt::Display for AIProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AIProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(AIProvider::None),
            "openai" => Ok(AIProvider::OpenAI),
            "anthropic" => Ok(AIProvider::Anthropic),
            "gemini" => Ok(AIProvider::Gemini),
            "local" => Ok(AIProvider::Local),
            other => Err(ConfigError::Validation(format!("unknown AI provider '{other}'"))),
        }
    }
}

/// AI-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    /// Selected AI provider
    pub provider: AIProvider,

    /// Model identifier (provider-specific). Empty = provider default
    pub model: String,

    /// Base URL for the Local provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Replace student names with placeholders before text leaves the machine
    pub anonymize: bool,

    /// Total attempts per call, first one included
    pub max_attempts: u32,

    /// Delay unit between attempts; rate limits back off exponentially from it
    pub retry_base_delay_ms: u64,

    /// HTTP request timeout
    pub timeout_secs: u64,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::None,
            model: String::new(),
            base_url: None,
            anonymize: true,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            timeout_secs: 60,
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl AISettings {
    /// Get the effective model (user-specified or provider default)
    pub fn effective_model(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            self.model.trim()
        }
    }

    /// Get the effective base URL for the Local provider
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_LOCAL_BASE_URL)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation("ai.max_attempts must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation("ai.timeout_secs must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "ai.temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Apply `AI_ENABLED_PROVIDER`, `<PROVIDER>_MODEL` and `LOCAL_BASE_URL`.
    ///
    /// An unknown provider name is logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(name) = non_blank("AI_ENABLED_PROVIDER") {
            match name.parse::<AIProvider>() {
                Ok(provider) => self.provider = provider,
                Err(e) => log::warn!("AI_ENABLED_PROVIDER ignored: {e}"),
            }
        }

        if let Some(model) = self.provider.model_env_var().and_then(|var| non_blank(var)) {
            self.model = model.trim().to_string();
        }

        if let Some(url) = non_blank("LOCAL_BASE_URL") {
            self.base_url = Some(url.trim().to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ai: AISettings,
    /// Column layout of the roster and subject exports
    pub sources: SourceLayout,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conseil");
        config_dir.join("settings.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ai.validate()?;
        self.sources
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Read `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Load settings from disk plus process environment, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        let mut settings = match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Error loading {}: {e}; using default settings", path.display());
                Self::default()
            }
        };
        settings.ai.apply_env(|name| std::env::var(name).ok());
        settings
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Ensure directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(io_err)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let ai = AISettings::default();
        assert_eq!(ai.provider, AIProvider::None);
        assert!(ai.anonymize);
        assert_eq!(ai.max_attempts, 3);
        assert_eq!(ai.max_tokens, 500);
        assert_eq!(ai.effective_model(), "");
    }

    #[test]
    fn test_effective_model_and_url() {
        let mut ai = AISettings {
            provider: AIProvider::Anthropic,
            ..Default::default()
        };
        assert_eq!(ai.effective_model(), "claude-3-5-haiku-20241022");
        ai.model = "claude-3-opus-20240229".into();
        assert_eq!(ai.effective_model(), "claude-3-opus-20240229");

        assert_eq!(ai.effective_base_url(), "http://localhost:11434");
        ai.base_url = Some("http://gpu-box:8080/".into());
        assert_eq!(ai.effective_base_url(), "http://gpu-box:8080");
    }

    #[test]
    fn test_model_lists() {
        for provider in AIProvider::ENABLED {
            assert!(provider.available_models().contains(&provider.default_model()));
        }
        assert!(AIProvider::OpenAI.accepts_model("o3-mini-2025-01-31"));
        assert!(!AIProvider::OpenAI.accepts_model("gpt-5-imaginary"));
        assert!(AIProvider::Local.accepts_model("my-finetune"));
        assert!(!AIProvider::None.accepts_model("gpt-4o"));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<AIProvider>().unwrap(), AIProvider::OpenAI);
        assert_eq!(" gemini ".parse::<AIProvider>().unwrap(), AIProvider::Gemini);
        assert_eq!("".parse::<AIProvider>().unwrap(), AIProvider::None);
        assert!("mistral-cloud".parse::<AIProvider>().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut ai = AISettings::default();
        ai.apply_env(env(&[
            ("AI_ENABLED_PROVIDER", "local"),
            ("LOCAL_MODEL", "qwen2.5"),
            ("OPENAI_MODEL", "gpt-4"),
            ("LOCAL_BASE_URL", "http://10.0.0.2:11434"),
        ]));
        assert_eq!(ai.provider, AIProvider::Local);
        assert_eq!(ai.model, "qwen2.5");
        assert_eq!(ai.base_url.as_deref(), Some("http://10.0.0.2:11434"));
    }

    #[test]
    fn test_env_unknown_provider_ignored() {
        let mut ai = AISettings {
            provider: AIProvider::Gemini,
            ..Default::default()
        };
        ai.apply_env(env(&[("AI_ENABLED_PROVIDER", "watson")]));
        assert_eq!(ai.provider, AIProvider::Gemini);
    }

    #[test]
    fn test_parse_toml() {
        let settings = Settings::from_toml(
            r#"
[ai]
provider = "openai"
model = "gpt-4o"
anonymize = false
retry_base_delay_ms = 250

[sources.subject]
delimiter = ","
"#,
        )
        .unwrap();
        assert_eq!(settings.ai.provider, AIProvider::OpenAI);
        assert_eq!(settings.ai.model, "gpt-4o");
        assert!(!settings.ai.anonymize);
        assert_eq!(settings.ai.retry_base_delay_ms, 250);
        assert_eq!(settings.ai.max_attempts, 3);
        assert_eq!(settings.sources.subject.delimiter, ',');
        assert_eq!(settings.sources.roster.student, "Élève");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Settings::from_toml("[ai]\nmax_attempts = 0\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            Settings::from_toml("[ai]\nprovider = \"watson\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/settings.toml");

        let mut settings = Settings::default();
        settings.ai.provider = AIProvider::Local;
        settings.ai.base_url = Some("http://localhost:9999".into());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Settings::default());
    }
}
