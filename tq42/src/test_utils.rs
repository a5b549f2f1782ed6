//! # Test utils
//!
//! ⚠️ Do not use at production. Available for tests and under the `test_utils` feature. ⚠️
//!
//! [`MockTransport`] is a [`ChannelTransport`] that replays scripted server behavior. Each opened
//! stream consumes the next script. Everything the client writes is recorded, so tests can assert
//! on the exact sequence of outbound messages.
//!
//! ```rust
//! use tq42::test_utils::{ask_message, completion_message, MockTransport, Step};
//!
//! let transport = MockTransport::new();
//! transport.script([
//!     Step::Receive(ask_message(1, &["x"], &[&[2.0]])),
//!     Step::Receive(completion_message(2)),
//! ]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tonic::Status;

use crate::channel::{ChannelTransport, MessageStream};
use crate::protocol::{Ask, ChannelMessage, Parameter, Payload, SequenceId};

use crate::prelude::*;

/// Scripted server behavior of a single stream.
#[derive(Clone, Debug)]
pub enum Step {
    /// Deliver a message.
    Receive(ChannelMessage),
    /// Fail the stream with a transport error.
    Fail(Status),
    /// Close the stream from the server side.
    Close,
    /// Never deliver anything again.
    Stall,
}

/// Record of a stream opened by the client.
#[derive(Clone, Debug, Default)]
pub struct StreamRecord {
    /// Channel the stream was scoped to.
    pub channel_id: String,
    /// Messages written by the client, starting with the handshake.
    pub sent: Vec<ChannelMessage>,
    /// Whether the client closed its outbound half.
    pub closed: bool,
}

/// In-memory [`ChannelTransport`] which replays scripted streams.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    created: usize,
    scripts: VecDeque<std::result::Result<Vec<Step>, Status>>,
    streams: Vec<StreamRecord>,
    ready_failure: Option<Status>,
    ready_calls: Vec<Duration>,
}

/// Stream produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockStream {
    index: usize,
    steps: VecDeque<Step>,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a transport without scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a script for the next opened stream.
    pub fn script(&self, steps: impl IntoIterator<Item = Step>) -> &Self {
        self.lock()
            .scripts
            .push_back(Ok(steps.into_iter().collect()));
        self
    }

    /// Makes the next attempt to open a stream fail with `status`.
    pub fn fail_open(&self, status: Status) -> &Self {
        self.lock().scripts.push_back(Err(status));
        self
    }

    /// Makes every wait for connectivity fail with `status`.
    pub fn fail_ready(&self, status: Status) -> &Self {
        self.lock().ready_failure = Some(status);
        self
    }

    /// Timeouts passed to [`ChannelTransport::wait_ready`], in order of calls.
    pub fn ready_calls(&self) -> Vec<Duration> {
        self.lock().ready_calls.clone()
    }

    /// Records of all opened streams.
    pub fn streams(&self) -> Vec<StreamRecord> {
        self.lock().streams.clone()
    }

    /// All messages written by the client across streams.
    pub fn sent(&self) -> Vec<ChannelMessage> {
        self.lock()
            .streams
            .iter()
            .flat_map(|stream| stream.sent.iter().cloned())
            .collect()
    }

    /// Payloads of all messages written by the client across streams.
    pub fn sent_payloads(&self) -> Vec<Payload> {
        self.sent().into_iter().map(|message| message.payload).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ChannelTransport for MockTransport {
    type Stream = MockStream;

    async fn create_channel(&self) -> Result<String> {
        let mut state = self.lock();
        state.created += 1;
        Ok(format!("channel-{}", state.created))
    }

    async fn open(&self, channel_id: &str, handshake: ChannelMessage) -> Result<MockStream> {
        let mut state = self.lock();

        let steps = match state.scripts.pop_front() {
            Some(Ok(steps)) => steps,
            Some(Err(status)) => return Err(Error::from(status)),
            None => return Err(Error::from(Status::unavailable("no scripted stream left"))),
        };

        state.streams.push(StreamRecord {
            channel_id: channel_id.to_string(),
            sent: vec![handshake],
            closed: false,
        });

        Ok(MockStream {
            index: state.streams.len() - 1,
            steps: steps.into(),
            state: self.state.clone(),
        })
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        state.ready_calls.push(timeout);

        match &state.ready_failure {
            Some(status) => Err(Error::from(status.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageStream for MockStream {
    async fn send(&mut self, message: ChannelMessage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let stream = &mut state.streams[self.index];

        if stream.closed {
            return Err(Error::from(Status::unavailable("outbound half is closed")));
        }
        stream.sent.push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ChannelMessage>> {
        match self.steps.pop_front() {
            Some(Step::Receive(message)) => Ok(Some(message)),
            Some(Step::Fail(status)) => Err(Error::from(status)),
            Some(Step::Close) => Ok(None),
            Some(Step::Stall) | None => std::future::pending().await,
        }
    }

    async fn close_send(&mut self) {
        self.state.lock().unwrap().streams[self.index].closed = true;
    }
}

/// Creates an ask message with the given headers and parameter vectors.
pub fn ask_message(id: SequenceId, headers: &[&str], parameters: &[&[f64]]) -> ChannelMessage {
    ChannelMessage::new(
        id,
        Payload::Ask(Ask {
            parameters: parameters
                .iter()
                .map(|values| Parameter::from(values.to_vec()))
                .collect(),
            headers: headers.iter().map(|header| header.to_string()).collect(),
        }),
    )
}

/// Creates a completion message.
pub fn completion_message(id: SequenceId) -> ChannelMessage {
    ChannelMessage::new(id, Payload::Completion)
}
