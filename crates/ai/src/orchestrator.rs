// Comment rewriting and synthesis on top of a `Completion` backend.

use conseil_config::ai::{AIConfigStatus, ResolvedAIConfig};
use conseil_core::{Bulletin, Half, Student};

use crate::anonymize::Anonymizer;
use crate::error::{AiError, BackendError, FailureKind};
use crate::prompts;
use crate::provider::{Completion, ProviderClient};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};

pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Outcome of a batch run. Failed items keep their previous text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub failure: Option<FailureKind>,
}

pub struct AiOrchestrator {
    backend: Box<dyn Completion>,
    anonymizer: Option<Anonymizer>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    max_tokens: u32,
    temperature: f32,
}

impl AiOrchestrator {
    /// Default generation settings, anonymization on.
    pub fn new(backend: Box<dyn Completion>) -> Self {
        Self {
            backend,
            anonymizer: Some(Anonymizer::new()),
            policy: RetryPolicy::default(),
            sleeper: Box::new(ThreadSleeper),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Build the HTTP backend for a resolved configuration.
    pub fn from_config(config: &ResolvedAIConfig) -> Result<Self, AiError> {
        if config.status != AIConfigStatus::Ready {
            let reason = config
                .blocking_reason
                .clone()
                .unwrap_or_else(|| format!("AI status is {}", config.status.as_str()));
            return Err(AiError::NotConfigured(reason));
        }

        let backend = ProviderClient::from_config(config)?;
        log::info!(
            "AI backend {} model {} (anonymization {})",
            config.provider.name(),
            config.model,
            if config.anonymize { "on" } else { "off" }
        );

        Ok(Self::new(Box::new(backend))
            .with_policy(RetryPolicy::new(config.max_attempts, config.retry_base_delay))
            .with_generation(config.max_tokens, config.temperature)
            .with_anonymization(config.anonymize))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_anonymization(mut self, enabled: bool) -> Self {
        self.anonymizer = enabled.then(Anonymizer::new);
        self
    }

    pub fn anonymizer(&self) -> Option<&Anonymizer> {
        self.anonymizer.as_ref()
    }

    pub fn backend(&self) -> &dyn Completion {
        self.backend.as_ref()
    }

    /// One completion with the retry schedule applied.
    pub fn call(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String, AiError> {
        let reply = self.policy.run(self.sleeper.as_ref(), |_| {
            self.backend.complete(prompt, max_tokens, temperature)
        })?;
        Ok(reply)
    }

    fn hide(&mut self, text: &str, student: Option<&Student>) -> String {
        match (self.anonymizer.as_mut(), student) {
            (Some(anon), Some(s)) => anon.anonymize(text, &s.last_name, &s.first_name),
            _ => text.to_string(),
        }
    }

    fn reveal(&self, text: &str, student: Option<&Student>) -> String {
        match (self.anonymizer.as_ref(), student) {
            (Some(anon), Some(s)) => anon.deanonymize(text, &s.last_name, &s.first_name),
            _ => text.to_string(),
        }
    }

    fn try_preprocess(&mut self, text: &str, student: Option<&Student>) -> Result<String, AiError> {
        let hidden = self.hide(text, student);
        let reply = self.call(&prompts::highlight_prompt(&hidden), self.max_tokens, self.temperature)?;
        if reply.is_empty() {
            return Err(BackendError::new(
                self.backend.provider().name(),
                FailureKind::MalformedResponse,
                "empty reply",
            )
            .into());
        }
        Ok(self.reveal(&reply, student))
    }

    /// Wrap positive and negative spans of a comment in highlight markup.
    /// Any failure returns `text` unchanged.
    pub fn preprocess_comment(&mut self, text: &str, student: Option<&Student>) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        match self.try_preprocess(text, student) {
            Ok(marked) => marked,
            Err(e) => {
                log::error!("comment highlighting failed: {e}");
                text.to_string()
            }
        }
    }

    /// One general comment from `(subject, comment)` pairs. No pairs yields
    /// an empty string.
    pub fn synthesize_general_comment(
        &mut self,
        comments: &[(&str, &str)],
        student: Option<&Student>,
    ) -> Result<String, AiError> {
        let hidden: Vec<(&str, String)> = comments
            .iter()
            .filter(|(_, comment)| !comment.trim().is_empty())
            .map(|(subject, comment)| (*subject, self.hide(comment, student)))
            .collect();
        if hidden.is_empty() {
            return Ok(String::new());
        }

        let prompt = prompts::general_comment_prompt(hidden.iter().map(|(s, c)| (*s, c.as_str())));
        let reply = self.call(&prompt, self.max_tokens, self.temperature)?;
        Ok(self.reveal(&reply, student))
    }

    /// Highlight every non-empty subject comment of both halves.
    ///
    /// `progress(done, total)` fires after each comment.
    pub fn preprocess_all<F>(&mut self, bulletins: &mut [Bulletin], mut progress: F) -> BatchReport
    where
        F: FnMut(usize, usize),
    {
        let total: usize = bulletins
            .iter()
            .flat_map(|b| b.subjects.values())
            .map(|s| Half::ALL.iter().filter(|h| s.half(**h).comment_text().is_some()).count())
            .sum();

        let mut report = BatchReport::default();
        for bulletin in bulletins.iter_mut() {
            let student = bulletin.student.clone();
            for (name, subject) in bulletin.subjects.iter_mut() {
                for half in Half::ALL {
                    let Some(original) = subject.half(half).comment_text().map(str::to_string) else {
                        continue;
                    };
                    match self.try_preprocess(&original, Some(&student)) {
                        Ok(marked) => {
                            subject.half_mut(half).comment = Some(marked);
                            report.succeeded += 1;
                        }
                        Err(e) => {
                            log::error!("highlighting {name} {half} for {student} failed: {e}");
                            report.failed += 1;
                            report.warnings.push(format!("Erreur prétraitement {half} {name} pour {student}: {e}"));
                        }
                    }
                    progress(report.total(), total);
                }
            }
        }
        report
    }

    /// Write a generated general comment for `half` on every bulletin.
    ///
    /// `progress(done, total)` fires after each student.
    pub fn synthesize_all<F>(&mut self, bulletins: &mut [Bulletin], half: Half, mut progress: F) -> BatchReport
    where
        F: FnMut(usize, usize),
    {
        let total = bulletins.len();
        let mut report = BatchReport::default();

        for bulletin in bulletins.iter_mut() {
            let owned: Vec<(String, String)> = bulletin
                .subject_comments(half)
                .into_iter()
                .map(|(s, c)| (s.to_string(), c.to_string()))
                .collect();
            let pairs: Vec<(&str, &str)> = owned.iter().map(|(s, c)| (s.as_str(), c.as_str())).collect();

            if pairs.is_empty() {
                log::warn!("no {half} subject comment for {}", bulletin.student);
                report.failed += 1;
                report
                    .warnings
                    .push(format!("Aucune appréciation {half} trouvée pour {}", bulletin.student));
            } else {
                match self.synthesize_general_comment(&pairs, Some(&bulletin.student)) {
                    Ok(comment) => {
                        bulletin.set_general_comment(half, Some(comment));
                        report.succeeded += 1;
                    }
                    Err(e) => {
                        log::error!("general comment for {} failed: {e}", bulletin.student);
                        report.failed += 1;
                        report
                            .warnings
                            .push(format!("Erreur appréciation générale pour {}: {e}", bulletin.student));
                    }
                }
            }
            progress(report.total(), total);
        }
        report
    }

    /// One minimal request, no retries.
    pub fn test_connection(&self) -> ConnectionTestResult {
        let provider = self.backend.provider();
        let model = self.backend.model().to_string();
        match self.backend.complete(prompts::CONNECTION_TEST_PROMPT, 1, 0.0) {
            Ok(_) => ConnectionTestResult {
                success: true,
                message: format!("Connexion {} réussie avec le modèle {model}", provider.display_name()),
                failure: None,
            },
            Err(e) => {
                let message = match e.kind {
                    FailureKind::MissingCredential => "Clé API manquante".to_string(),
                    FailureKind::InvalidCredential => format!("Clé API {} invalide", provider.display_name()),
                    FailureKind::PermissionDenied => format!(
                        "Accès refusé - Vérifiez les permissions de votre clé API {}",
                        provider.display_name()
                    ),
                    FailureKind::ModelNotFound => format!("Modèle '{model}' non trouvé ou non accessible"),
                    FailureKind::RateLimited => "Limite de taux atteinte - Attendez quelques instants".to_string(),
                    FailureKind::Connection => format!("Erreur de connexion à l'API {}", provider.display_name()),
                    FailureKind::MalformedResponse => format!("Réponse invalide de {}", provider.display_name()),
                    FailureKind::Unexpected => format!("Erreur inattendue: {}", e.message),
                };
                log::warn!("connection test failed: {e}");
                ConnectionTestResult {
                    success: false,
                    message,
                    failure: Some(e.kind),
                }
            }
        }
    }
}
