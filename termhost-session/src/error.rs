use thiserror::Error;

/// Error taxonomy for session construction and control operations.
///
/// `ProtocolError` and `TransportError` are deliberately absent: those are
/// wire/transport concerns that belong to the codec and host layers, not to
/// a session itself.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("session is not in a state that allows this operation: {0}")]
    StateError(String),

    #[error("pty error")]
    Pty(#[from] termhost_pty::PtyError),
}
