use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::protocol::ChannelMessage;

use crate::prelude::*;

/// Transport which creates channels and opens duplex message streams to them.
///
/// [`Client`](crate::client::Client) implements this trait over gRPC. Other implementations are
/// useful for testing (see `test_utils` feature).
#[async_trait]
pub trait ChannelTransport: Clone + Debug + Send + Sync + 'static {
    /// Duplex stream produced by [`ChannelTransport::open`].
    type Stream: MessageStream;

    /// Creates a new channel and returns its server-assigned ID.
    async fn create_channel(&self) -> Result<String>;

    /// Opens a duplex stream scoped to `channel_id`.
    ///
    /// The `handshake` is the first message written to the stream.
    async fn open(&self, channel_id: &str, handshake: ChannelMessage) -> Result<Self::Stream>;

    /// Waits until the underlying connection is ready or `timeout` lapses.
    async fn wait_ready(&mut self, timeout: Duration) -> Result<()>;
}

/// Duplex stream of channel messages.
#[async_trait]
pub trait MessageStream: Send + 'static {
    /// Writes a message to the outbound half.
    async fn send(&mut self, message: ChannelMessage) -> Result<()>;

    /// Receives the next inbound message.
    ///
    /// Returns `None` once the peer has closed the stream.
    async fn recv(&mut self) -> Result<Option<ChannelMessage>>;

    /// Closes the outbound half. Subsequent calls have no effect.
    async fn close_send(&mut self);
}
