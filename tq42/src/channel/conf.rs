use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::channel::ReconnectPolicy;

/// Channel session configuration.
///
/// By default a session has no deadline and no per-message timeout, and reconnects according to
/// [`ReconnectPolicy::default`].
///
/// ```rust
/// use std::time::Duration;
/// use tq42::channel::{ReconnectPolicy, SessionConf};
///
/// let conf = SessionConf::default()
///     .max_duration(Some(Duration::from_secs(3600)))
///     .message_timeout(Some(Duration::from_secs(300)))
///     .reconnect(ReconnectPolicy::never());
///
/// assert_eq!(conf.get_message_timeout(), Some(Duration::from_secs(300)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SessionConf {
    pub(crate) max_duration: Option<Duration>,
    pub(crate) message_timeout: Option<Duration>,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl SessionConf {
    /// Sets the budget for the whole session. `None` means unbounded.
    pub fn max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Sets how long the session waits for the next message before it is considered stalled.
    /// `None` means forever.
    pub fn message_timeout(mut self, message_timeout: Option<Duration>) -> Self {
        self.message_timeout = message_timeout;
        self
    }

    /// Sets reconnect policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Ends the session with [`SessionEnd::Cancelled`](crate::channel::SessionEnd::Cancelled)
    /// once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Budget for the whole session.
    pub fn get_max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Per-message timeout.
    pub fn get_message_timeout(&self) -> Option<Duration> {
        self.message_timeout
    }

    /// Reconnect policy.
    pub fn get_reconnect(&self) -> &ReconnectPolicy {
        &self.reconnect
    }
}
