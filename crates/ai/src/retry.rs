// Retry schedule for backend calls.
//
// The decision is a pure function of (attempt, failure kind) so the schedule
// can be checked without a network or a clock. Sleeping goes through
// `Sleeper`.

use std::time::Duration;

use crate::error::{BackendError, FailureKind};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// What to do after attempt number `attempt` (0-based) failed with `kind`.
    ///
    /// Rate limits wait `base * 2^attempt`; other retryable kinds wait `base`.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if !kind.is_retryable() || attempt + 1 >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        let delay = match kind {
            FailureKind::RateLimited => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
            _ => self.base_delay,
        };
        RetryDecision::Retry(delay)
    }

    /// Run `op` until it succeeds or the policy gives up. `op` receives the
    /// 0-based attempt number.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, BackendError>
    where
        F: FnMut(u32) -> Result<T, BackendError>,
    {
        let mut attempt = 0;
        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            match self.decide(attempt, err.kind) {
                RetryDecision::GiveUp => return Err(err),
                RetryDecision::Retry(delay) => {
                    log::warn!(
                        "retry {}/{} in {}ms ({err})",
                        attempt + 1,
                        self.max_attempts - 1,
                        delay.as_millis()
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

pub trait Sleeper: Send {
    fn sleep(&self, delay: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<Duration>>>);

    impl Sleeper for Recorder {
        fn sleep(&self, delay: Duration) {
            self.0.lock().unwrap().push(delay);
        }
    }

    fn failure(kind: FailureKind) -> BackendError {
        BackendError::new("test", kind, "boom")
    }

    #[test]
    fn rate_limit_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.decide(0, FailureKind::RateLimited), RetryDecision::Retry(Duration::from_millis(100)));
        assert_eq!(policy.decide(1, FailureKind::RateLimited), RetryDecision::Retry(Duration::from_millis(200)));
        assert_eq!(policy.decide(2, FailureKind::RateLimited), RetryDecision::Retry(Duration::from_millis(400)));
        assert_eq!(policy.decide(3, FailureKind::RateLimited), RetryDecision::GiveUp);
    }

    #[test]
    fn transient_uses_fixed_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(50));
        assert_eq!(policy.decide(0, FailureKind::Connection), RetryDecision::Retry(Duration::from_millis(50)));
        assert_eq!(policy.decide(1, FailureKind::Unexpected), RetryDecision::Retry(Duration::from_millis(50)));
    }

    #[test]
    fn permanent_failures_give_up() {
        let policy = RetryPolicy::default();
        for kind in [
            FailureKind::MissingCredential,
            FailureKind::InvalidCredential,
            FailureKind::PermissionDenied,
            FailureKind::ModelNotFound,
            FailureKind::MalformedResponse,
        ] {
            assert_eq!(policy.decide(0, kind), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn run_sleeps_between_attempts_and_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let sleeper = Recorder::default();
        let mut calls = 0;
        let result: Result<(), _> = policy.run(&sleeper, |_| {
            calls += 1;
            Err(failure(FailureKind::RateLimited))
        });

        assert_eq!(calls, 3);
        assert_eq!(result.unwrap_err().kind, FailureKind::RateLimited);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn run_recovers() {
        let policy = RetryPolicy::default();
        let sleeper = Recorder::default();
        let result = policy.run(&sleeper, |attempt| {
            if attempt == 0 {
                Err(failure(FailureKind::Connection))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sleeper.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn run_stops_on_permanent_failure() {
        let sleeper = Recorder::default();
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::default().run(&sleeper, |_| {
            calls += 1;
            Err(failure(FailureKind::InvalidCredential))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(sleeper.0.lock().unwrap().is_empty());
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.decide(0, FailureKind::RateLimited), RetryDecision::GiveUp);
    }
}
