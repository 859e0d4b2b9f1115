//! Session-level error type.

use netherlink_protocol::ProtocolError;
use netherlink_transport::TransportError;
use thiserror::Error;

/// Failures surfaced by the session facade.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The external session is not connected; raised before doing work.
    #[error("session unavailable")]
    Unavailable,
    /// A listen request matched nothing in the known topic set.
    #[error("no known packet topic matches `{0}`")]
    InvalidTopic(String),
    /// A payload did not parse into its typed record.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] ProtocolError),
    /// The transport reported a failure.
    #[error("transport: {0}")]
    Transport(TransportError),
    /// The engine could not spawn one of its threads.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable => Self::Unavailable,
            other => Self::Transport(other),
        }
    }
}
