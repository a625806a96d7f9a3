//! `conseil-ai` - provider transports, name anonymization and the
//! orchestrator that rewrites and synthesizes bulletin comments.

pub mod anonymize;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod retry;

pub use anonymize::Anonymizer;
pub use error::{AiError, BackendError, FailureKind};
pub use orchestrator::{AiOrchestrator, BatchReport, ConnectionTestResult};
pub use provider::{Completion, ProviderClient};
pub use retry::{RetryDecision, RetryPolicy, Sleeper, ThreadSleeper};
