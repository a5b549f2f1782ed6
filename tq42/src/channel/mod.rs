//! # Channels
//!
//! A [`Channel`] is a server-side resource identified by an opaque ID. Algorithms running on the
//! platform are pointed at a channel ID and use it to request evaluations from the client, which
//! serves them by calling [`Channel::connect`].
//!
//! ## Session protocol
//!
//! [`Channel::connect`] opens a duplex stream with a handshake and then processes incoming
//! messages one at a time:
//!
//! * An ask with a sequential ID greater than any processed so far is passed to the
//!   [`AskHandler`]. Once the handler returns, the ask is acknowledged and the resulting tell is
//!   sent with the ID following the ask's one.
//! * An ask with an ID that was already processed is a redelivery and is ignored.
//! * A completion message is acknowledged and ends the session with [`SessionEnd::Completed`].
//!
//! A session also ends when no message arrives within the per-message timeout
//! ([`SessionEnd::Stalled`]) or when its overall budget is exhausted
//! ([`SessionEnd::DeadlineExceeded`]).
//!
//! Transient transport failures are recovered by reconnecting according to
//! [`ReconnectPolicy`]. Sequence bookkeeping survives reconnects, so asks redelivered on a new
//! stream are never evaluated twice.
//!
//! Whatever the outcome, the outbound half of the stream is closed and the finish callback is
//! called exactly once.
//!
//! ## Concurrent channels
//!
//! Sessions share no state. To serve several channels at once, run their `connect` futures
//! concurrently:
//!
//! ```rust,no_run
//! # use tq42::channel::Channel;
//! # use tq42::client::Client;
//! # use tq42::protocol::{Ask, Tell};
//! # async fn run(client: Client) -> tq42::errors::Result<()> {
//! let objective = Channel::create(&client).await?;
//! let local_optimizer = Channel::create(&client).await?;
//!
//! let evaluate = |ask: Ask| async move {
//!     let results = vec![0.0; ask.parameters.len()];
//!     Ok::<_, std::io::Error>(Tell::for_ask(ask, results))
//! };
//!
//! let (objective_end, optimizer_end) = tokio::join!(
//!     objective.connect(evaluate, || {}, None, None),
//!     local_optimizer.connect(evaluate, || {}, None, None),
//! );
//! # objective_end?; optimizer_end?;
//! # Ok(())
//! # }
//! ```

mod conf;
mod grpc;
mod handler;
mod retry;
mod session;
mod transport;

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::client::Client;

use crate::prelude::*;

pub use conf::SessionConf;
pub use grpc::GrpcStream;
pub use handler::AskHandler;
pub use retry::{ReconnectPolicy, Retry};
pub use session::SessionEnd;
pub use transport::{ChannelTransport, MessageStream};

pub use tokio_util::sync::CancellationToken;

use session::{OnFinish, Session};

/// Remote bidirectional message channel.
#[derive(Clone, Debug)]
pub struct Channel<T: ChannelTransport = Client> {
    id: String,
    client: T,
}

impl<T: ChannelTransport> Channel<T> {
    /// Creates a new channel on the server.
    pub async fn create(client: &T) -> Result<Self> {
        let id = client.create_channel().await?;
        log::debug!("[channel {id}] created");

        Ok(Self::from_id(client.clone(), id))
    }

    /// Refers to an existing channel by its ID.
    pub fn from_id(client: T, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }

    /// Server-assigned channel ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Client that owns this channel.
    pub fn client(&self) -> &T {
        &self.client
    }

    /// Serves asks of this channel with `handler` until the session ends.
    ///
    /// * `on_finish` is called exactly once after the session ends, regardless of the outcome.
    /// * `max_duration` limits the whole session. `None` means unbounded.
    /// * `message_timeout` limits the wait for each message. `None` means unbounded.
    ///
    /// Uses the default [`ReconnectPolicy`]. See [`Channel::connect_with_conf`] for full control.
    pub async fn connect<H, F>(
        &self,
        handler: H,
        on_finish: F,
        max_duration: Option<Duration>,
        message_timeout: Option<Duration>,
    ) -> Result<SessionEnd>
    where
        H: AskHandler,
        F: FnOnce() + Send,
    {
        let conf = SessionConf::default()
            .max_duration(max_duration)
            .message_timeout(message_timeout);
        self.connect_with_conf(handler, on_finish, conf).await
    }

    /// Serves asks of this channel with `handler` according to `conf`.
    ///
    /// Returns how the session ended, or an error if the transport failed beyond recovery or
    /// the handler failed.
    pub async fn connect_with_conf<H, F>(
        &self,
        handler: H,
        on_finish: F,
        conf: SessionConf,
    ) -> Result<SessionEnd>
    where
        H: AskHandler,
        F: FnOnce() + Send,
    {
        let _finish = OnFinish::new(on_finish);

        Session::new(self.id.clone(), self.client.clone(), handler, conf)
            .run()
            .await
    }
}

impl<T: ChannelTransport> Display for Channel<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::MockTransport;

    use super::*;

    #[tokio::test]
    async fn create_wraps_server_id() {
        let transport = MockTransport::new();

        let first = Channel::create(&transport).await.unwrap();
        let second = Channel::create(&transport).await.unwrap();

        assert_eq!(first.id(), "channel-1");
        assert_eq!(second.id(), "channel-2");
        assert_eq!(first.to_string(), "channel-1");
    }

    #[tokio::test]
    async fn existing_channel_by_id() {
        let channel = Channel::from_id(MockTransport::new(), "f00d");
        assert_eq!(channel.id(), "f00d");
    }
}
