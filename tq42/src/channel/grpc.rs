use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::{Extensions, Request, Status, Streaming};

use crate::channel::{ChannelTransport, MessageStream};
use crate::client::Client;
use crate::proto::ChannelMessageProto;
use crate::protocol::ChannelMessage;

use crate::prelude::*;

/// Duplex gRPC stream of a channel.
///
/// Outbound messages are queued to the request stream, inbound ones are read from the response
/// stream. Dropping the sender half-closes the call.
#[derive(Debug)]
pub struct GrpcStream {
    outbound: Option<mpsc::UnboundedSender<ChannelMessageProto>>,
    inbound: Streaming<ChannelMessageProto>,
}

#[async_trait]
impl MessageStream for GrpcStream {
    async fn send(&mut self, message: ChannelMessage) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| Error::from(Status::unavailable("outbound half is closed")))?;

        outbound
            .send(message.into())
            .map_err(|_| Error::from(Status::unavailable("request stream was dropped")))
    }

    async fn recv(&mut self) -> Result<Option<ChannelMessage>> {
        match self.inbound.message().await? {
            Some(message) => Ok(Some(ChannelMessage::try_from(message)?)),
            None => Ok(None),
        }
    }

    async fn close_send(&mut self) {
        self.outbound.take();
    }
}

#[async_trait]
impl ChannelTransport for Client {
    type Stream = GrpcStream;

    async fn create_channel(&self) -> Result<String> {
        let request = Request::from_parts(self.metadata(), Extensions::default(), ());
        let response = self.channel_service().create_channel(request).await?;
        Ok(response.into_inner().channel_id)
    }

    async fn open(&self, channel_id: &str, handshake: ChannelMessage) -> Result<GrpcStream> {
        let metadata = self.stream_metadata(channel_id)?;

        // The server replies with headers only after the first message, so the handshake has to
        // be queued before the call is awaited.
        let (outbound, rx) = mpsc::unbounded_channel();
        outbound
            .send(handshake.into())
            .map_err(|_| Error::from(Status::unavailable("request stream was dropped")))?;

        let request = Request::from_parts(
            metadata,
            Extensions::default(),
            UnboundedReceiverStream::new(rx),
        );
        let response = self
            .channel_service()
            .connect_channel_customer(request)
            .await?;
        log::trace!("[channel {channel_id}] stream opened");

        Ok(GrpcStream {
            outbound: Some(outbound),
            inbound: response.into_inner(),
        })
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        self.reconnect(timeout).await
    }
}
