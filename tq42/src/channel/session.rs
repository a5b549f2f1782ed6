use tokio::time;

use crate::channel::{AskHandler, ChannelTransport, MessageStream, SessionConf};
use crate::protocol::{ChannelMessage, Payload, SequenceId};

use crate::prelude::*;

/// Reason a channel session ended without an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server sent a completion message.
    Completed,
    /// No message arrived within the per-message timeout. This is how sessions end when the
    /// server has no more work and goes quiet.
    Stalled,
    /// The budget for the whole session was exceeded.
    DeadlineExceeded,
    /// Session was cancelled by the caller.
    Cancelled,
    /// Server closed the stream without a completion message.
    Closed,
}

/// Calls the wrapped function exactly once when dropped.
pub(crate) struct OnFinish<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnFinish<F> {
    pub(crate) fn new(callback: F) -> Self {
        Self(Some(callback))
    }
}

impl<F: FnOnce()> Drop for OnFinish<F> {
    fn drop(&mut self) {
        if let Some(callback) = self.0.take() {
            callback();
        }
    }
}

enum Incoming {
    Message(ChannelMessage),
    Closed,
    Stalled,
}

/// State of a single `connect` call.
pub(crate) struct Session<T: ChannelTransport, H: AskHandler> {
    channel_id: String,
    transport: T,
    handler: H,
    conf: SessionConf,
    stream: Option<T::Stream>,
    last_processed_sequence_id: SequenceId,
    retries: usize,
}

impl<T: ChannelTransport, H: AskHandler> Session<T, H> {
    pub(crate) fn new(channel_id: String, transport: T, handler: H, conf: SessionConf) -> Self {
        Self {
            channel_id,
            transport,
            handler,
            conf,
            stream: None,
            last_processed_sequence_id: 0,
            retries: 0,
        }
    }

    /// Drives the session to its end and closes the outbound half of the stream.
    pub(crate) async fn run(mut self) -> Result<SessionEnd> {
        let outcome = self.run_bounded().await;
        self.close().await;

        match &outcome {
            Ok(end) => log::debug!("[channel {}] session ended: {end:?}", self.channel_id),
            Err(err) => log::warn!("[channel {}] session failed: {err}", self.channel_id),
        }
        outcome
    }

    async fn run_bounded(&mut self) -> Result<SessionEnd> {
        let cancellation = self.conf.cancellation.clone();
        let max_duration = self.conf.max_duration;

        let bounded = async {
            match max_duration {
                Some(max_duration) => match time::timeout(max_duration, self.run_loop()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Ok(SessionEnd::DeadlineExceeded),
                },
                None => self.run_loop().await,
            }
        };

        match cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Ok(SessionEnd::Cancelled),
                outcome = bounded => outcome,
            },
            None => bounded.await,
        }
    }

    async fn run_loop(&mut self) -> Result<SessionEnd> {
        if let Err(err) = self.establish().await {
            self.recover(err).await?;
        }

        loop {
            match self.receive().await {
                Ok(end) => return Ok(end),
                Err(err) => self.recover(err).await?,
            }
        }
    }

    async fn establish(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.close_send().await;
        }

        let stream = self
            .transport
            .open(&self.channel_id, ChannelMessage::handshake())
            .await?;
        self.stream = Some(stream);

        log::debug!("[channel {}] stream established", self.channel_id);
        Ok(())
    }

    async fn recover(&mut self, err: Error) -> Result<()> {
        if !self.conf.reconnect.is_retryable(&err) {
            return Err(err);
        }
        log::warn!("[channel {}] stream failed: {err}", self.channel_id);

        let policy = self.conf.reconnect.clone();
        while self.retries < policy.max_attempts() {
            self.retries += 1;
            let timeout = policy.ready_timeout(self.retries);
            log::debug!(
                "[channel {}] reconnect attempt {}/{}, waiting up to {timeout:?}",
                self.channel_id,
                self.retries,
                policy.max_attempts()
            );

            if let Err(ready_err) = self.transport.wait_ready(timeout).await {
                log::debug!("[channel {}] not ready: {ready_err}", self.channel_id);
                continue;
            }

            match self.establish().await {
                Ok(_) => {
                    log::info!(
                        "[channel {}] reconnected after {} attempt(s)",
                        self.channel_id,
                        self.retries
                    );
                    self.retries = 0;
                    return Ok(());
                }
                Err(open_err) if policy.is_retryable(&open_err) => {
                    log::debug!("[channel {}] can't reopen stream: {open_err}", self.channel_id);
                }
                Err(open_err) => {
                    self.retries = 0;
                    return Err(open_err);
                }
            }
        }

        log::warn!(
            "[channel {}] no reconnect attempts left, giving up",
            self.channel_id
        );
        self.retries = 0;
        Err(err)
    }

    async fn receive(&mut self) -> Result<SessionEnd> {
        loop {
            let message = match self.next_message().await? {
                Incoming::Message(message) => message,
                Incoming::Closed => return Ok(SessionEnd::Closed),
                Incoming::Stalled => return Ok(SessionEnd::Stalled),
            };

            if let Some(end) = self.dispatch(message).await? {
                return Ok(end);
            }
        }
    }

    async fn next_message(&mut self) -> Result<Incoming> {
        let message_timeout = self.conf.message_timeout;
        let stream = self.stream()?;

        let received = match message_timeout {
            Some(message_timeout) => match time::timeout(message_timeout, stream.recv()).await {
                Ok(received) => received?,
                Err(_) => return Ok(Incoming::Stalled),
            },
            None => stream.recv().await?,
        };

        Ok(match received {
            Some(message) => Incoming::Message(message),
            None => Incoming::Closed,
        })
    }

    async fn dispatch(&mut self, message: ChannelMessage) -> Result<Option<SessionEnd>> {
        let id = message.sequential_message_id;

        match message.payload {
            Payload::Completion => {
                self.send(ChannelMessage::acknowledge(id)).await?;
                return Ok(Some(SessionEnd::Completed));
            }
            Payload::Ask(ask) => {
                if id <= self.last_processed_sequence_id {
                    log::debug!(
                        "[channel {}] ignoring ask #{id}, already processed up to #{}",
                        self.channel_id,
                        self.last_processed_sequence_id
                    );
                    return Ok(None);
                }
                ChannelMessage::answer_id(id)?;
                self.last_processed_sequence_id = id;

                log::trace!("[channel {}] processing ask #{id}", self.channel_id);
                let tell = self.handler.handle(ask).await.map_err(Error::Handler)?;

                self.send(ChannelMessage::acknowledge(id)).await?;
                self.send(ChannelMessage::tell(id, tell)?).await?;
            }
            Payload::Acknowledge(acknowledged) => {
                log::trace!(
                    "[channel {}] server acknowledged #{acknowledged}",
                    self.channel_id
                );
            }
            payload @ (Payload::Tell(_) | Payload::Handshake) => {
                log::warn!(
                    "[channel {}] ignoring unexpected message #{id}: {payload:?}",
                    self.channel_id
                );
            }
        }

        Ok(None)
    }

    async fn send(&mut self, message: ChannelMessage) -> Result<()> {
        self.stream()?.send(message).await
    }

    fn stream(&mut self) -> Result<&mut T::Stream> {
        self.stream.as_mut().ok_or_else(|| {
            Error::from(tonic::Status::unavailable(
                "channel stream is not established",
            ))
        })
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close_send().await;
        }
    }
}
