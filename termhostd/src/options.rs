use std::time::Duration;

use clap::Parser;

/// Host configuration (§6 of the design: all fields have defaults so the
/// daemon can run unattended with no flags at all).
#[derive(Parser, Clone, Debug)]
#[command(name = "termhostd", about = "Terminal session multiplexer host")]
pub struct HostOptions {
    /// TCP port clients attach to.
    #[arg(long, default_value_t = HostOptions::DEFAULT_TCP_PORT)]
    pub tcp_port: u16,

    /// Name of the local Unix domain socket, created under a per-user
    /// runtime directory alongside the TCP listener.
    #[arg(long, default_value = HostOptions::DEFAULT_PIPE_NAME)]
    pub pipe_name: String,

    /// Maximum number of concurrently live sessions.
    #[arg(long, default_value_t = HostOptions::DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Per-session ring buffer capacity in bytes, used when a client's
    /// `CreateSession` does not specify one.
    #[arg(long, default_value_t = HostOptions::DEFAULT_BUFFER_SIZE)]
    pub default_buffer_size: usize,

    /// Idle-reaper tick interval, in seconds.
    #[arg(long, default_value_t = 30)]
    pub reap_interval_secs: u64,

    /// Idle timeout applied to every session unless overridden; omit to
    /// disable idle reaping entirely.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,
}

impl HostOptions {
    pub const PROTOCOL_VERSION: u8 = 1;
    pub const DEFAULT_TCP_PORT: u16 = 7777;
    pub const DEFAULT_PIPE_NAME: &'static str = "termhost";
    pub const DEFAULT_MAX_SESSIONS: usize = 100;
    pub const DEFAULT_BUFFER_SIZE: usize = 65536;

    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// Path of the Unix domain socket, rooted under `$XDG_RUNTIME_DIR` when
    /// set and falling back to `/tmp` otherwise.
    #[must_use]
    pub fn socket_path(&self) -> std::path::PathBuf {
        let base = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
        std::path::PathBuf::from(base).join(format!("{}.sock", self.pipe_name))
    }
}

impl Default for HostOptions {
    fn default() -> HostOptions {
        HostOptions {
            tcp_port: Self::DEFAULT_TCP_PORT,
            pipe_name: Self::DEFAULT_PIPE_NAME.to_string(),
            max_sessions: Self::DEFAULT_MAX_SESSIONS,
            default_buffer_size: Self::DEFAULT_BUFFER_SIZE,
            reap_interval_secs: 30,
            idle_timeout_secs: None,
        }
    }
}
