//! # Errors
//!
//! All fallible operations return [`Result`]. Failures reported by the platform as gRPC statuses
//! are classified on conversion: authentication and permission problems, as well as rejected
//! arguments, get dedicated variants, everything else is kept as [`Error::Transport`].
//!
//! Expected ways for a channel session to end (completion, stall, deadline) are not errors. See
//! [`SessionEnd`](crate::channel::SessionEnd).

use tonic::{Code, Status};

/// Common result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by an [`AskHandler`](crate::channel::AskHandler).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// All errors produced by this library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure reported by the RPC layer.
    #[error("transport error: {0}")]
    Transport(Status),
    /// The caller does not have access to the requested resource.
    #[error("permission denied: {}", .0.message())]
    PermissionDenied(Status),
    /// Access token is missing, invalid or expired.
    #[error("unauthenticated: {}", .0.message())]
    Unauthenticated(Status),
    /// The request violates constraints of the requested resource.
    #[error("invalid argument: {}", .0.message())]
    InvalidArgument(Status),
    /// Failed to establish a connection to the endpoint.
    #[error("connection error: {0}")]
    Connection(#[from] tonic::transport::Error),
    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Peer sent a message which violates the channel protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Ask handler failed.
    #[error("ask handler failed: {0}")]
    Handler(HandlerError),
}

impl Error {
    /// gRPC status associated with this error, if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Error::Transport(status)
            | Error::PermissionDenied(status)
            | Error::Unauthenticated(status)
            | Error::InvalidArgument(status) => Some(status),
            _ => None,
        }
    }

    /// gRPC status code associated with this error, if any.
    pub fn code(&self) -> Option<Code> {
        self.status().map(Status::code)
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::PermissionDenied => Error::PermissionDenied(status),
            Code::Unauthenticated => Error::Unauthenticated(status),
            Code::InvalidArgument | Code::NotFound | Code::Unknown => Error::InvalidArgument(status),
            _ => Error::Transport(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_classified() {
        assert!(matches!(
            Error::from(Status::permission_denied("no")),
            Error::PermissionDenied(_)
        ));
        assert!(matches!(
            Error::from(Status::unauthenticated("expired")),
            Error::Unauthenticated(_)
        ));
        assert!(matches!(
            Error::from(Status::not_found("missing")),
            Error::InvalidArgument(_)
        ));
        assert!(matches!(
            Error::from(Status::unavailable("down")),
            Error::Transport(_)
        ));
    }

    #[test]
    fn code_is_kept_after_classification() {
        let err = Error::from(Status::unknown("boom"));
        assert_eq!(err.code(), Some(Code::Unknown));
        assert_eq!(err.status().unwrap().message(), "boom");

        assert_eq!(Error::Protocol("bad".into()).code(), None);
    }
}
