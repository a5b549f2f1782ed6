use std::time::Duration;

use tonic::Code;

use crate::consts::{DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_BACKOFF_STEP};

use crate::prelude::*;

/// Defines a retry strategy.
///
/// When a session loses its stream because of a transient failure, it may be re-established
/// according to this strategy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Retry {
    /// Never reconnect.
    Never,
    /// Perform several reconnect attempts. Attempt `n` waits for connectivity up to `n * step`.
    Attempts(
        /// Number of attempts.
        usize,
        /// Backoff step.
        Duration,
    ),
}

impl Default for Retry {
    fn default() -> Self {
        Retry::Attempts(DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_BACKOFF_STEP)
    }
}

/// Reconnect policy of a channel session.
///
/// Only transport errors with one of the [`retryable`](Self::retryable) status codes trigger a
/// reconnect. By default these are `DATA_LOSS`, `UNAVAILABLE` and `INTERNAL`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    retry: Retry,
    retryable: Vec<Code>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            retry: Retry::default(),
            retryable: vec![Code::DataLoss, Code::Unavailable, Code::Internal],
        }
    }
}

impl ReconnectPolicy {
    /// Policy which never reconnects.
    pub fn never() -> Self {
        Self {
            retry: Retry::Never,
            ..Self::default()
        }
    }

    /// Sets retry strategy.
    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    /// Sets status codes which are considered transient.
    pub fn with_retryable(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.retryable = codes.into_iter().collect();
        self
    }

    /// Retry strategy.
    pub fn retry(&self) -> Retry {
        self.retry
    }

    /// Status codes which are considered transient.
    pub fn retryable(&self) -> &[Code] {
        &self.retryable
    }

    /// Maximum number of consecutive reconnect attempts.
    pub fn max_attempts(&self) -> usize {
        match self.retry {
            Retry::Never => 0,
            Retry::Attempts(attempts, _) => attempts,
        }
    }

    /// Time to wait for connectivity during reconnect `attempt` (counting from `1`).
    pub fn ready_timeout(&self, attempt: usize) -> Duration {
        match self.retry {
            Retry::Never => Duration::ZERO,
            Retry::Attempts(_, step) => {
                step.saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
            }
        }
    }

    /// Returns `true` if `err` is a transient failure which should trigger a reconnect.
    pub fn is_retryable(&self, err: &Error) -> bool {
        match err {
            Error::Transport(status) => self.retryable.contains(&status.code()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use tonic::Status;

    use super::*;

    #[test]
    fn default_policy_matches_transient_codes() {
        let policy = ReconnectPolicy::default();

        assert!(policy.is_retryable(&Error::from(Status::unavailable("down"))));
        assert!(policy.is_retryable(&Error::from(Status::internal("oops"))));
        assert!(policy.is_retryable(&Error::from(Status::data_loss("lost"))));

        assert!(!policy.is_retryable(&Error::from(Status::permission_denied("no"))));
        assert!(!policy.is_retryable(&Error::from(Status::deadline_exceeded("late"))));
        assert!(!policy.is_retryable(&Error::Protocol("garbage".into())));
    }

    #[test]
    fn ready_timeout_grows_linearly() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.ready_timeout(1), Duration::from_secs(2));
        assert_eq!(policy.ready_timeout(3), Duration::from_secs(6));

        let policy = policy.with_retry(Retry::Attempts(2, Duration::from_millis(250)));
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.ready_timeout(2), Duration::from_millis(500));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn ready_timeout_saturates_for_huge_attempts() {
        let policy =
            ReconnectPolicy::default().with_retry(Retry::Attempts(1, Duration::from_secs(1)));

        assert_eq!(
            policy.ready_timeout(u32::MAX as usize + 2),
            Duration::from_secs(u32::MAX as u64)
        );
    }

    #[test]
    fn never_policy_has_no_attempts() {
        let policy = ReconnectPolicy::never();
        assert_eq!(policy.max_attempts(), 0);
        assert!(policy.is_retryable(&Error::from(Status::unavailable("down"))));
    }

    #[test]
    fn retryable_codes_are_configurable() {
        let policy = ReconnectPolicy::default().with_retryable([Code::ResourceExhausted]);

        assert!(policy.is_retryable(&Error::from(Status::resource_exhausted("busy"))));
        assert!(!policy.is_retryable(&Error::from(Status::unavailable("down"))));
    }
}
