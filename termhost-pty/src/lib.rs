//! The PTY capability consumed by the session host.
//!
//! The host treats pseudo-terminal creation as an external collaborator: it
//! only needs something it can spawn, read, write, resize, and wait on. This
//! crate is that thin boundary, with a single concrete backend ([`local`])
//! built on `portable-pty` so the workspace has something runnable end to
//! end.

mod errors;
mod local;
mod size;

pub use errors::PtyError;
pub use local::{local, LocalPtyBuilder, LocalPtyHandle, LocalPtyReader};
pub use size::PtySize;

/// The read half of a spawned PTY.
///
/// Owned exclusively by one session's read loop: `read` blocks the calling
/// (blocking-pool) thread until the child writes or exits, so nothing else
/// may share this handle.
pub trait PtyReader: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PtyError>;
}

/// The write/resize/lifecycle half of a spawned PTY.
///
/// Safe to share behind a lock across tasks: writes, resizes and kills are
/// all quick, non-blocking-in-practice operations distinct from the
/// potentially long-blocking read side.
pub trait PtyHandle: Send {
    /// Write bytes to the child process's stdin.
    fn write(&mut self, input: &[u8]) -> Result<usize, PtyError>;

    /// Resize the pseudo-terminal's window.
    fn resize(&mut self, size: PtySize) -> Result<(), PtyError>;

    /// Ask the child process to terminate. `force` selects a stronger signal
    /// where the platform distinguishes one.
    fn kill(&mut self, force: bool) -> Result<(), PtyError>;

    /// Poll for an exit status without blocking.
    fn try_wait(&mut self) -> Result<Option<i32>, PtyError>;

    /// Block until the child process exits, returning its exit code.
    fn wait(&mut self) -> Result<i32, PtyError>;
}
