use thiserror::Error;

/// Host-layer errors (§7): these never escape their own attachment or
/// accept-loop iteration. A `Protocol` error closes the offending
/// connection after an `Error` frame; a `Transport` error terminates the
/// affected attachment only — the session underneath it survives.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] termhost_protocol::DecodeError),

    #[error(transparent)]
    Session(#[from] termhost_session::SessionError),
}
