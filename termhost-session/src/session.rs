use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use termhost_pty::{local, PtyHandle, PtyReader, PtySize};
use termhost_screen::Screen;
use termhost_vte::Parser;

use crate::error::SessionError;
use crate::ring_buffer::RingBuffer;

/// Output chunks delivered to subscribers are reference-counted so the read
/// loop copies each chunk out of the PTY exactly once regardless of how many
/// subscribers are currently attached.
pub type Chunk = Arc<[u8]>;

/// How many chunks a lagging subscriber may fall behind before the oldest
/// are dropped from under it. `tokio::sync::broadcast` enforces this as a
/// ring buffer of *messages*, not bytes, but at a 4 KiB read chunk size this
/// comfortably covers the "capacity ≥ 100" requirement.
pub const SUBSCRIBER_CAPACITY: usize = 128;

const READ_CHUNK_SIZE: usize = 4096;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Starting,
    Running,
    Exited,
    Failed,
}

/// Everything needed to spawn a session's PTY.
pub struct SessionOptions {
    pub id: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
    pub buffer_size: usize,
    pub idle_timeout: Option<Duration>,
}

/// A point-in-time description of a session, independent of the wire
/// format, used both for registry listings and `RenderScreen`-adjacent
/// queries.
#[derive(Clone, Debug)]
pub struct SessionInfo {
    pub id: String,
    pub cmd: String,
    pub cwd: Option<String>,
    pub state: SessionState,
    pub created_ms: i64,
    pub exit: Option<i32>,
    pub cols: u16,
    pub rows: u16,
}

struct Inner {
    id: String,
    cmd: String,
    cwd: Option<String>,
    created_ms: i64,
    state: Mutex<SessionState>,
    last_activity: Mutex<Instant>,
    exit_code: Mutex<Option<i32>>,
    ring: Mutex<RingBuffer>,
    screen: Mutex<Screen>,
    output: broadcast::Sender<Chunk>,
    pty: Mutex<Box<dyn PtyHandle>>,
    idle_timeout: Option<Duration>,
    cancel: CancellationToken,
    exited: tokio::sync::Notify,
}

/// A running (or recently exited) PTY-backed session.
///
/// Holds a handle to the background read task; dropping a `Session` does
/// not stop it — call [`Session::kill`] then [`Session::join`] (or just
/// `kill` and let the process exit drive EOF) for an orderly shutdown.
pub struct Session {
    inner: Arc<Inner>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Spawns the PTY and starts the read loop immediately. On spawn
    /// failure no session is constructed; the caller surfaces the error
    /// (the session never existed, rather than existing in `Failed`).
    pub fn spawn(options: SessionOptions) -> Result<Session, SessionError> {
        if options.id.trim().is_empty() {
            return Err(SessionError::InvalidArgument("session id must not be empty".into()));
        }
        if options.buffer_size == 0 {
            return Err(SessionError::InvalidArgument("buffer size must be > 0".into()));
        }

        let size = PtySize { rows: options.rows, cols: options.cols, ..PtySize::default() };
        let mut builder = local(&options.cmd).with_args(&options.args).with_size(size);
        if let Some(cwd) = &options.cwd {
            builder = builder.with_cwd(cwd);
        }
        for (key, value) in &options.env {
            builder = builder.with_env(key, value);
        }
        let (reader, handle) = builder.spawn()?;
        let reader: Box<dyn PtyReader> = Box::new(reader);
        let handle: Box<dyn PtyHandle> = Box::new(handle);

        let (output, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        let inner = Arc::new(Inner {
            id: options.id,
            cmd: options.cmd,
            cwd: options.cwd.map(|p| p.to_string_lossy().into_owned()),
            created_ms: now_ms(),
            state: Mutex::new(SessionState::Running),
            last_activity: Mutex::new(Instant::now()),
            exit_code: Mutex::new(None),
            ring: Mutex::new(RingBuffer::new(options.buffer_size)),
            screen: Mutex::new(Screen::new(options.cols as usize, options.rows as usize)),
            output,
            pty: Mutex::new(handle),
            idle_timeout: options.idle_timeout,
            cancel: CancellationToken::new(),
            exited: tokio::sync::Notify::new(),
        });

        let read_task = tokio::task::spawn_blocking({
            let inner = Arc::clone(&inner);
            move || read_loop(inner, reader)
        });

        Ok(Session { inner, read_task: Mutex::new(Some(read_task)) })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    #[must_use]
    pub fn info(&self) -> SessionInfo {
        let screen = self.inner.screen.lock().unwrap();
        SessionInfo {
            id: self.inner.id.clone(),
            cmd: self.inner.cmd.clone(),
            cwd: self.inner.cwd.clone(),
            state: *self.inner.state.lock().unwrap(),
            created_ms: self.inner.created_ms,
            exit: *self.inner.exit_code.lock().unwrap(),
            cols: screen.buffer().width() as u16,
            rows: screen.buffer().height() as u16,
        }
    }

    /// Writes to the PTY's stdin. Fails unless the session is `Running`.
    pub fn send_input(&self, bytes: &[u8]) -> Result<(), SessionError> {
        self.require_running()?;
        self.inner.pty.lock().unwrap().write(bytes)?;
        Ok(())
    }

    /// Resizes both the PTY and the screen buffer. No-op if not `Running`.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        if self.state() != SessionState::Running {
            return Ok(());
        }
        self.inner
            .pty
            .lock()
            .unwrap()
            .resize(PtySize { rows, cols, ..PtySize::default() })?;
        self.inner.screen.lock().unwrap().resize(cols as usize, rows as usize);
        Ok(())
    }

    #[must_use]
    pub fn buffered_output(&self) -> Vec<u8> {
        self.inner.ring.lock().unwrap().to_array()
    }

    /// Renders the current screen to ANSI, optionally resizing first.
    pub fn render_screen(&self, size: Option<(u16, u16)>) -> Vec<u8> {
        let mut screen = self.inner.screen.lock().unwrap();
        if let Some((cols, rows)) = size {
            screen.resize(cols as usize, rows as usize);
        }
        screen.buffer().render_to_ansi()
    }

    /// Registers a new output subscriber and atomically snapshots the
    /// buffered output as of the same instant: the subscriber is
    /// registered under the same lock that reads the ring buffer, so the
    /// first chunk it can observe via the returned receiver is exactly the
    /// one immediately following the snapshot (§4.6 attach ordering).
    #[must_use]
    pub fn subscribe(&self) -> (Vec<u8>, broadcast::Receiver<Chunk>) {
        let ring = self.inner.ring.lock().unwrap();
        let buffered = ring.to_array();
        let receiver = self.inner.output.subscribe();
        (buffered, receiver)
    }

    /// Blocks (asynchronously) until the session's read loop has finished
    /// and the exit code (if any) has been recorded.
    ///
    /// The `Notified` future is created *before* the state check on every
    /// iteration: `Notify::notified()` snapshots the notification state at
    /// creation time, so a `notify_waiters()` landing between that snapshot
    /// and the `.await` below still wakes it. Checking the state first and
    /// only then awaiting `notified()` would leave a window where the read
    /// loop's transition-and-notify could happen in between, and this
    /// caller would block forever.
    pub async fn wait_for_exit(&self) -> Option<i32> {
        loop {
            let notified = self.inner.exited.notified();
            if *self.inner.state.lock().unwrap() != SessionState::Running {
                return *self.inner.exit_code.lock().unwrap();
            }
            notified.await;
        }
    }

    /// Requests PTY termination. Harmless if the session has already
    /// exited.
    pub fn kill(&self, force: bool) -> Result<(), SessionError> {
        if self.state() != SessionState::Running {
            return Ok(());
        }
        self.inner.pty.lock().unwrap().kill(force)?;
        Ok(())
    }

    #[must_use]
    pub fn is_idle_timed_out(&self) -> bool {
        let Some(timeout) = self.inner.idle_timeout else { return false };
        if self.state() != SessionState::Running {
            return false;
        }
        self.inner.last_activity.lock().unwrap().elapsed() > timeout
    }

    /// Cancels the read task and awaits its completion, then disposes the
    /// PTY. Any live subscribers observe end-of-stream once the broadcast
    /// sender is dropped with the session.
    pub async fn dispose(&self) {
        self.inner.cancel.cancel();
        let _ = self.kill(true);
        if let Some(task) = self.read_task.lock().unwrap().take() {
            let _ = task.await;
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

fn read_loop(inner: Arc<Inner>, mut reader: Box<dyn PtyReader>) {
    let mut parser = Parser::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];

    loop {
        if inner.cancel.is_cancelled() {
            break;
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                log::debug!("session {} read loop ending: {err}", inner.id);
                break;
            }
        };

        *inner.last_activity.lock().unwrap() = Instant::now();

        let chunk: Chunk = Arc::from(&buf[..n]);
        {
            let mut ring = inner.ring.lock().unwrap();
            ring.write(&chunk);
            // Ignored: a send error just means there are no subscribers
            // right now, which is not a failure of the read loop.
            let _ = inner.output.send(Arc::clone(&chunk));
        }

        {
            let mut screen = inner.screen.lock().unwrap();
            parser.advance(&chunk, &mut *screen);
            let replies = screen.take_replies();
            if !replies.is_empty() {
                let _ = inner.pty.lock().unwrap().write(&replies);
            }
        }
    }

    let exit_code = inner.pty.lock().unwrap().try_wait().ok().flatten();
    *inner.exit_code.lock().unwrap() = exit_code;
    *inner.state.lock().unwrap() = if exit_code.is_some() {
        SessionState::Exited
    } else {
        SessionState::Failed
    };
    inner.exited.notify_waiters();
    // Dropping `inner.output`'s last strong reference (once the Session and
    // every Subscription clone are gone) completes every receiver; an
    // explicit `close()` isn't available on the sender, so subscribers
    // additionally observe completion via `Session::state()` no longer
    // being `Running`.
}

impl Session {
    fn require_running(&self) -> Result<(), SessionError> {
        if self.state() != SessionState::Running {
            return Err(SessionError::StateError("session is not running".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_options(id: &str) -> SessionOptions {
        SessionOptions {
            id: id.to_string(),
            cmd: "/bin/cat".to_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            cols: 80,
            rows: 24,
            buffer_size: 4096,
            idle_timeout: None,
        }
    }

    #[test]
    fn rejects_empty_id() {
        let mut opts = echo_options("");
        opts.id = String::new();
        let err = Session::spawn(opts).unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let mut opts = echo_options("zero-buf");
        opts.buffer_size = 0;
        let err = Session::spawn(opts).unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn echoes_input_back_through_the_ring_buffer() {
        let session = Session::spawn(echo_options("echo-session")).unwrap();
        session.send_input(b"hello\n").unwrap();

        let mut seen = Vec::new();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            seen = session.buffered_output();
            if seen.windows(5).any(|w| w == b"hello") {
                break;
            }
        }
        assert!(seen.windows(5).any(|w| w == b"hello"));

        session.dispose().await;
    }

    #[tokio::test]
    async fn subscribe_snapshot_then_new_output_has_no_gap_or_duplicate() {
        let session = Session::spawn(echo_options("subscribe-session")).unwrap();
        session.send_input(b"first\n").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (buffered, mut rx) = session.subscribe();
        assert!(buffered.windows(5).any(|w| w == b"first"));

        session.send_input(b"second\n").unwrap();
        let chunk = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert!(chunk.windows(6).any(|w| w == b"second"));

        session.dispose().await;
    }
}
