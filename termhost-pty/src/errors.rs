use std::io;

use thiserror::Error;

/// Failure modes surfaced by a [`crate::Pty`] implementation.
///
/// This is the `PtyError` leaf of the host's error taxonomy: spawn failures
/// and read/write I/O errors both collapse into this type. Whether a given
/// failure is terminal for the owning session is decided by the caller, not
/// by this crate.
#[derive(Error, Debug)]
pub enum PtyError {
    #[error("error from pty I/O")]
    Io(#[from] io::Error),

    #[error("failed to spawn child process")]
    Spawn(#[source] anyhow::Error),

    #[error("failed to resize pty")]
    Resize(#[source] anyhow::Error),
}
