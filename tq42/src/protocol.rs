//! # Channel protocol messages
//!
//! Every message carries a sequential ID, a timestamp and exactly one [`Payload`]:
//!
//! * [`Payload::Handshake`] is empty and is sent once by the client right after a stream is
//!   opened.
//! * [`Payload::Ask`] is a unit of work sent by the server.
//! * [`Payload::Tell`] is the client's answer to an ask.
//! * [`Payload::Acknowledge`] confirms receipt of a particular sequential ID.
//! * [`Payload::Completion`] signals that the server will not send any more asks.

use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::proto::channel_message_proto::Data;
use crate::proto::{
    AcknowledgeDataProto, AskDataProto, ChannelMessageProto, CompletionDataProto, ParameterProto,
    TellDataProto,
};

use crate::prelude::*;

/// Sequential message ID.
pub type SequenceId = u64;

/// Vector of parameter values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameter {
    /// Values.
    pub values: Vec<f64>,
}

impl From<Vec<f64>> for Parameter {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Unit of work sent by the server.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ask {
    /// Parameter vectors to evaluate.
    pub parameters: Vec<Parameter>,
    /// Names of parameter dimensions.
    pub headers: Vec<String>,
}

/// Client's answer to an [`Ask`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tell {
    /// Echoed parameter vectors.
    pub parameters: Vec<Parameter>,
    /// Echoed headers.
    pub headers: Vec<String>,
    /// Computed results, one per parameter vector.
    pub results: Vec<f64>,
    /// Proposed candidate points (local optimizer channels).
    pub candidates: Option<Vec<Parameter>>,
}

impl Tell {
    /// Creates a tell which echoes parameters and headers of the `ask`.
    pub fn for_ask(ask: Ask, results: Vec<f64>) -> Self {
        Self {
            parameters: ask.parameters,
            headers: ask.headers,
            results,
            candidates: None,
        }
    }

    /// Attaches proposed candidate points.
    pub fn with_candidates(mut self, candidates: Vec<Parameter>) -> Self {
        self.candidates = Some(candidates);
        self
    }
}

/// Payload of a [`ChannelMessage`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Empty message opening a stream.
    Handshake,
    /// Work unit.
    Ask(Ask),
    /// Answer.
    Tell(Tell),
    /// Receipt of a sequential ID.
    Acknowledge(SequenceId),
    /// End of work.
    Completion,
}

/// Message flowing over a channel stream.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelMessage {
    /// Sequential message ID.
    pub sequential_message_id: SequenceId,
    /// Time of sending, if known.
    pub timestamp: Option<SystemTime>,
    /// Payload.
    pub payload: Payload,
}

impl ChannelMessage {
    /// Creates a message stamped with the current time.
    pub fn new(sequential_message_id: SequenceId, payload: Payload) -> Self {
        Self {
            sequential_message_id,
            timestamp: Some(SystemTime::now()),
            payload,
        }
    }

    /// Handshake message.
    pub fn handshake() -> Self {
        Self::new(0, Payload::Handshake)
    }

    /// Acknowledgement of `id`.
    pub fn acknowledge(id: SequenceId) -> Self {
        Self::new(0, Payload::Acknowledge(id))
    }

    /// Tell answering the ask with sequential ID `ask_id`.
    ///
    /// Fails with [`Error::Protocol`] if `ask_id` is the last representable ID.
    pub fn tell(ask_id: SequenceId, tell: Tell) -> Result<Self> {
        Ok(Self::new(Self::answer_id(ask_id)?, Payload::Tell(tell)))
    }

    /// Sequential ID of the tell answering the ask with ID `ask_id`.
    pub fn answer_id(ask_id: SequenceId) -> Result<SequenceId> {
        ask_id.checked_add(1).ok_or_else(|| {
            Error::Protocol(format!(
                "ask #{ask_id} can't be answered, sequential IDs are exhausted"
            ))
        })
    }
}

impl From<Parameter> for ParameterProto {
    fn from(value: Parameter) -> Self {
        Self {
            values: value.values,
        }
    }
}

impl From<ParameterProto> for Parameter {
    fn from(value: ParameterProto) -> Self {
        Self {
            values: value.values,
        }
    }
}

fn convert_all<A: Into<B>, B>(values: Vec<A>) -> Vec<B> {
    values.into_iter().map(Into::into).collect()
}

impl From<ChannelMessage> for ChannelMessageProto {
    fn from(value: ChannelMessage) -> Self {
        let data = match value.payload {
            Payload::Handshake => None,
            Payload::Ask(ask) => Some(Data::AskData(AskDataProto {
                parameters: convert_all(ask.parameters),
                headers: ask.headers,
            })),
            Payload::Tell(tell) => Some(Data::TellData(TellDataProto {
                parameters: convert_all(tell.parameters),
                headers: tell.headers,
                results: tell.results,
                candidates: convert_all(tell.candidates.unwrap_or_default()),
            })),
            Payload::Acknowledge(id) => Some(Data::AcknowledgeData(AcknowledgeDataProto { id })),
            Payload::Completion => Some(Data::CompletionData(CompletionDataProto {})),
        };

        Self {
            sequential_message_id: value.sequential_message_id,
            timestamp: value.timestamp.map(prost_types::Timestamp::from),
            data,
        }
    }
}

impl TryFrom<ChannelMessageProto> for ChannelMessage {
    type Error = Error;

    fn try_from(value: ChannelMessageProto) -> Result<Self> {
        let timestamp = match value.timestamp {
            Some(timestamp) => Some(SystemTime::try_from(timestamp).map_err(|err| {
                Error::Protocol(format!(
                    "invalid timestamp of message #{}: {err}",
                    value.sequential_message_id
                ))
            })?),
            None => None,
        };

        let payload = match value.data {
            None => Payload::Handshake,
            Some(Data::AskData(ask)) => Payload::Ask(Ask {
                parameters: convert_all(ask.parameters),
                headers: ask.headers,
            }),
            Some(Data::TellData(tell)) => Payload::Tell(Tell {
                parameters: convert_all(tell.parameters),
                headers: tell.headers,
                results: tell.results,
                candidates: if tell.candidates.is_empty() {
                    None
                } else {
                    Some(convert_all(tell.candidates))
                },
            }),
            Some(Data::AcknowledgeData(ack)) => Payload::Acknowledge(ack.id),
            Some(Data::CompletionData(_)) => Payload::Completion,
        };

        Ok(Self {
            sequential_message_id: value.sequential_message_id,
            timestamp,
            payload,
        })
    }
}
