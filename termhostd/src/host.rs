use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, UnixListener};

use termhost_session::SessionRegistry;

use crate::client;
use crate::options::HostOptions;
use crate::reaper;

/// The running host: a session registry plus whatever transports are
/// currently accepting connections (§4.6 Start).
pub struct Host {
    options: Arc<HostOptions>,
    registry: Arc<SessionRegistry>,
}

impl Host {
    #[must_use]
    pub fn new(options: HostOptions) -> Host {
        let registry = Arc::new(SessionRegistry::new(options.max_sessions));
        Host { options: Arc::new(options), registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Binds every configured listener, starts the idle reaper, and accepts
    /// clients until the process receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let tcp = TcpListener::bind(("0.0.0.0", self.options.tcp_port)).await?;
        log::info!("listening on tcp://0.0.0.0:{}", self.options.tcp_port);

        let socket_path = self.options.socket_path();
        let unix = bind_unix_socket(&socket_path)?;
        log::info!("listening on unix socket {}", socket_path.display());

        let reaper_handle = tokio::spawn(reaper::run(Arc::clone(&self.registry), self.options.reap_interval()));

        let registry = Arc::clone(&self.registry);
        let options = Arc::clone(&self.options);
        let tcp_accept = tokio::spawn(accept_tcp(tcp, Arc::clone(&registry), Arc::clone(&options)));
        let unix_accept = tokio::spawn(accept_unix(unix, registry, options, socket_path.clone()));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutdown signal received");
            }
            result = tcp_accept => {
                if let Err(err) = result {
                    log::error!("tcp accept loop ended unexpectedly: {err}");
                }
            }
            result = unix_accept => {
                if let Err(err) = result {
                    log::error!("unix accept loop ended unexpectedly: {err}");
                }
            }
        }

        reaper_handle.abort();
        let _ = std::fs::remove_file(&socket_path);
        Ok(())
    }
}

fn bind_unix_socket(path: &PathBuf) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path)
}

async fn accept_tcp(listener: TcpListener, registry: Arc<SessionRegistry>, options: Arc<HostOptions>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let client_id = format!("tcp:{addr}");
                log::info!("[{client_id}] connected");
                let _ = stream.set_nodelay(true);
                let registry = Arc::clone(&registry);
                let options = Arc::clone(&options);
                tokio::spawn(client::handle_client(Box::new(stream), registry, options, client_id));
            }
            Err(err) => {
                log::error!("tcp accept error: {err}");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

async fn accept_unix(
    listener: UnixListener,
    registry: Arc<SessionRegistry>,
    options: Arc<HostOptions>,
    socket_path: PathBuf,
) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let client_id = format!("unix:{}", next_unix_client_id());
                log::info!("[{client_id}] connected");
                let registry = Arc::clone(&registry);
                let options = Arc::clone(&options);
                tokio::spawn(client::handle_client(Box::new(stream), registry, options, client_id));
            }
            Err(err) => {
                if !socket_path.exists() {
                    log::info!("unix socket removed, stopping accept loop");
                    break;
                }
                log::error!("unix accept error: {err}");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

fn next_unix_client_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
