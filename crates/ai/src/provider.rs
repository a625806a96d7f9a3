// Provider transports
//
// One blocking HTTP call per `complete`. Retries live in the orchestrator;
// this layer only maps responses to text or to a classified `BackendError`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use conseil_config::ai::ResolvedAIConfig;
use conseil_config::settings::AIProvider;

use crate::error::{AiError, BackendError, FailureKind};

pub const USER_AGENT: &str = concat!("conseil/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const OPENAI_API_BASE: &str = "https://api.openai.com";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Text generation behind a single call shape.
pub trait Completion: Send {
    fn provider(&self) -> AIProvider;

    fn model(&self) -> &str;

    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, BackendError>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<MessagesBlock>,
}

#[derive(Deserialize)]
struct MessagesBlock {
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<GenerateContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerateContent<'a> {
    parts: Vec<GeneratePart<'a>>,
}

#[derive(Serialize)]
struct GeneratePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GenerateCandidate>,
}

#[derive(Deserialize)]
struct GenerateCandidate {
    content: Option<GenerateReply>,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    parts: Vec<GenerateReplyPart>,
}

#[derive(Deserialize)]
struct GenerateReplyPart {
    text: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Credential shape per transport.
#[derive(Debug, Clone)]
enum Endpoint {
    /// OpenAI and OpenAI-compatible local servers; bearer token optional.
    ChatCompletions { api_key: Option<String> },
    /// Anthropic Messages API.
    Messages { api_key: String },
    /// Gemini generateContent.
    GenerateContent { api_key: String },
}

pub struct ProviderClient {
    provider: AIProvider,
    model: String,
    base_url: String,
    endpoint: Endpoint,
    http: reqwest::blocking::Client,
}

impl ProviderClient {
    /// Build the transport for a resolved configuration.
    pub fn from_config(config: &ResolvedAIConfig) -> Result<Self, AiError> {
        let provider = config.provider;
        let required_key = || {
            config.api_key.clone().ok_or_else(|| {
                AiError::NotConfigured(config.blocking_reason.clone().unwrap_or_else(|| {
                    format!("no API key for {}", provider.display_name())
                }))
            })
        };

        let (endpoint, base_url) = match provider {
            AIProvider::OpenAI => (
                Endpoint::ChatCompletions { api_key: Some(required_key()?) },
                OPENAI_API_BASE.to_string(),
            ),
            AIProvider::Local => (
                Endpoint::ChatCompletions { api_key: config.api_key.clone() },
                local_root(config.base_url.as_deref().unwrap_or_default()),
            ),
            AIProvider::Anthropic => (
                Endpoint::Messages { api_key: required_key()? },
                ANTHROPIC_API_BASE.to_string(),
            ),
            AIProvider::Gemini => (
                Endpoint::GenerateContent { api_key: required_key()? },
                GEMINI_API_BASE.to_string(),
            ),
            AIProvider::None => {
                return Err(AiError::NotConfigured("no AI provider enabled".into()));
            }
        };

        if config.model.trim().is_empty() {
            return Err(AiError::NotConfigured("no model selected".into()));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(if config.timeout.is_zero() { DEFAULT_TIMEOUT } else { config.timeout })
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AiError::Client(e.to_string()))?;

        Ok(Self {
            provider,
            model: config.model.clone(),
            base_url,
            endpoint,
            http,
        })
    }

    /// Point the transport at another API root (used for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fail(&self, kind: FailureKind, message: impl Into<String>) -> BackendError {
        BackendError::new(self.provider.name(), kind, message)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, BackendError> {
        let resp = request
            .send()
            .map_err(|e| self.fail(FailureKind::Connection, e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|e| self.fail(FailureKind::Connection, format!("failed to read response body: {e}")))?;
        let text = text.trim_start_matches('\u{feff}');

        if !(200..300).contains(&status) {
            let body: serde_json::Value = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
            let message = error_message(&body).unwrap_or_else(|| format!("HTTP {status}"));
            let kind = classify(self.provider, status, &body);
            log::debug!("{} returned {status}: {message}", self.provider.name());
            return Err(self.fail(kind, message).with_status(status));
        }

        Ok(text.to_string())
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, text: &str) -> Result<T, BackendError> {
        serde_json::from_str(text).map_err(|e| {
            self.fail(
                FailureKind::MalformedResponse,
                format!("{e} (body: {})", text.chars().take(200).collect::<String>()),
            )
        })
    }

    fn reply(&self, text: Option<String>) -> Result<String, BackendError> {
        text.map(|t| t.trim().to_string())
            .ok_or_else(|| self.fail(FailureKind::MalformedResponse, "response carries no text"))
    }

    fn chat_completions(
        &self,
        api_key: Option<&str>,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens,
            temperature,
        };
        let mut request = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = self.parse(&self.send(request)?)?;
        self.reply(response.choices.into_iter().next().and_then(|c| c.message.content))
    }

    fn messages(&self, api_key: &str, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens,
            temperature,
        };
        let request = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: MessagesResponse = self.parse(&self.send(request)?)?;
        self.reply(response.content.into_iter().find_map(|b| b.text))
    }

    fn generate_content(
        &self,
        api_key: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, BackendError> {
        let body = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature,
            },
        };
        let request = self
            .http
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", api_key)
            .json(&body);

        let response: GenerateResponse = self.parse(&self.send(request)?)?;
        let text = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .reduce(|mut acc, part| {
                acc.push_str(&part);
                acc
            });
        self.reply(text)
    }
}

impl Completion for ProviderClient {
    fn provider(&self) -> AIProvider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, BackendError> {
        log::debug!(
            "{} request: model={} max_tokens={max_tokens} prompt_chars={}",
            self.provider.name(),
            self.model,
            prompt.chars().count()
        );
        match &self.endpoint {
            Endpoint::ChatCompletions { api_key } => {
                self.chat_completions(api_key.as_deref(), prompt, max_tokens, temperature)
            }
            Endpoint::Messages { api_key } => self.messages(api_key, prompt, max_tokens, temperature),
            Endpoint::GenerateContent { api_key } => {
                self.generate_content(api_key, prompt, max_tokens, temperature)
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Server root for a local OpenAI-compatible endpoint; a trailing `/v1` is
/// dropped because request paths carry it.
fn local_root(base_url: &str) -> String {
    let root = base_url.trim().trim_end_matches('/');
    root.strip_suffix("/v1").unwrap_or(root).to_string()
}

/// `error.message` is where all supported providers put the explanation.
fn error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Status-driven classification, with the provider-specific cases Gemini
/// reports through a 400 body.
pub fn classify(provider: AIProvider, status: u16, body: &serde_json::Value) -> FailureKind {
    if provider == AIProvider::Gemini && status == 400 {
        let text = body.to_string().to_lowercase();
        if text.contains("api_key_invalid") || text.contains("api key not valid") {
            return FailureKind::InvalidCredential;
        }
    }
    FailureKind::from_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conseil_config::ai::{AIConfigStatus, KeySource};

    fn resolved(provider: AIProvider, api_key: Option<&str>) -> ResolvedAIConfig {
        ResolvedAIConfig {
            provider,
            model: provider.default_model().to_string(),
            base_url: (provider == AIProvider::Local).then(|| "http://localhost:11434/v1/".to_string()),
            api_key: api_key.map(str::to_string),
            key_source: KeySource::Environment,
            anonymize: true,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            max_tokens: 500,
            temperature: 0.7,
            status: AIConfigStatus::Ready,
            blocking_reason: None,
        }
    }

    #[test]
    fn local_root_strips_version() {
        assert_eq!(local_root("http://localhost:11434"), "http://localhost:11434");
        assert_eq!(local_root("http://localhost:11434/v1/"), "http://localhost:11434");
        assert_eq!(local_root(" http://gpu:8000/ "), "http://gpu:8000");
    }

    #[test]
    fn from_config_requires_key_except_local() {
        let err = ProviderClient::from_config(&resolved(AIProvider::OpenAI, None)).err().unwrap();
        assert!(matches!(err, AiError::NotConfigured(_)));

        let local = ProviderClient::from_config(&resolved(AIProvider::Local, None)).unwrap();
        assert_eq!(local.base_url(), "http://localhost:11434");
        assert_eq!(local.model(), "llama3.2");
    }

    #[test]
    fn from_config_disabled() {
        let err = ProviderClient::from_config(&resolved(AIProvider::None, None)).err().unwrap();
        assert!(matches!(err, AiError::NotConfigured(_)));
    }

    #[test]
    fn error_message_extraction() {
        let body = serde_json::json!({"error": {"message": "bad key", "type": "auth"}});
        assert_eq!(error_message(&body).as_deref(), Some("bad key"));
        let body = serde_json::json!({"error": "plain"});
        assert_eq!(error_message(&body).as_deref(), Some("plain"));
        assert_eq!(error_message(&serde_json::Value::Null), None);
    }

    #[test]
    fn gemini_invalid_key_on_400() {
        let body = serde_json::json!({"error": {"code": 400, "status": "INVALID_ARGUMENT",
            "details": [{"reason": "API_KEY_INVALID"}]}});
        assert_eq!(classify(AIProvider::Gemini, 400, &body), FailureKind::InvalidCredential);
        assert_eq!(classify(AIProvider::OpenAI, 400, &body), FailureKind::Unexpected);
    }
}
