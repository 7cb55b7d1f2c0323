use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use termhost_protocol::{encode_frame, DecodeError, FrameDecoder, Message};
use termhost_session::{Chunk, Session, SessionOptions, SessionRegistry};

use crate::error::HostError;
use crate::options::HostOptions;
use crate::transport::DuplexStream;
use crate::wire_convert::{to_wire_info, to_wire_infos};

const READ_CHUNK: usize = 4096;

/// Runs one client connection end to end. Errors are logged and otherwise
/// swallowed here: per §7, a transport or protocol failure on one
/// connection must never affect the host or any other client.
pub async fn handle_client(
    stream: Box<dyn DuplexStream>,
    registry: Arc<SessionRegistry>,
    options: Arc<HostOptions>,
    client_id: String,
) {
    if let Err(err) = run(stream, registry, options, &client_id).await {
        log::warn!("[{client_id}] connection ended: {err}");
    } else {
        log::debug!("[{client_id}] connection closed");
    }
}

async fn run(
    stream: Box<dyn DuplexStream>,
    registry: Arc<SessionRegistry>,
    options: Arc<HostOptions>,
    client_id: &str,
) -> Result<(), HostError> {
    let (mut read_half, write_half) = tokio::io::split(stream);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(writer_task(write_half, out_rx));

    send(&out_tx, &Message::Hello { version: HostOptions::PROTOCOL_VERSION });

    let mut decoder = FrameDecoder::new();
    let mut pending: VecDeque<Message> = VecDeque::new();
    let mut buf = [0u8; READ_CHUNK];

    match next_message(&mut read_half, &mut decoder, &mut pending, &mut buf).await? {
        Some(Message::Hello { version }) => {
            if version != HostOptions::PROTOCOL_VERSION {
                log::warn!(
                    "[{client_id}] peer speaks protocol version {version}, host is {}",
                    HostOptions::PROTOCOL_VERSION
                );
            }
        }
        Some(other) => {
            return Err(HostError::Protocol(format!("expected Hello first, got {other:?}")));
        }
        None => return Ok(()),
    }

    loop {
        let message = match next_message(&mut read_half, &mut decoder, &mut pending, &mut buf).await {
            Ok(None) => break,
            Ok(Some(m)) => m,
            Err(HostError::Decode(err)) => {
                send(&out_tx, &Message::Error { message: err.to_string() });
                return Err(HostError::Decode(err));
            }
            Err(err) => return Err(err),
        };

        match message {
            Message::ListSessions => {
                send(&out_tx, &Message::SessionList { sessions: to_wire_infos(registry.list()) });
            }
            Message::CreateSession { id, cmd, args, cwd, env, cols, rows } => {
                let session_options = SessionOptions {
                    id,
                    cmd,
                    args: args.unwrap_or_default(),
                    cwd: cwd.map(PathBuf::from),
                    env: env.unwrap_or_default(),
                    cols,
                    rows,
                    buffer_size: options.default_buffer_size,
                    idle_timeout: options.idle_timeout(),
                };
                match registry.create(session_options) {
                    Ok(session) => {
                        send(&out_tx, &Message::SessionCreated { info: to_wire_info(session.info()) });
                    }
                    Err(err) => send(&out_tx, &Message::Error { message: err.to_string() }),
                }
            }
            Message::KillSession { id, force } => match registry.kill(&id, force) {
                Ok(_found) => {}
                Err(err) => send(&out_tx, &Message::Error { message: err.to_string() }),
            },
            Message::Attach { id, cols, rows } => {
                let Some(session) = registry.get(&id) else {
                    send(&out_tx, &Message::Error { message: format!("no such session: {id}") });
                    continue;
                };
                let _ = session.resize(cols, rows);
                let (buffered, output_rx) = session.subscribe();
                send(&out_tx, &Message::Attached { info: to_wire_info(session.info()), buffered });

                let outcome = run_attached(
                    &mut read_half,
                    &mut decoder,
                    &mut pending,
                    &mut buf,
                    &session,
                    &out_tx,
                    output_rx,
                    client_id,
                )
                .await?;
                if matches!(outcome, AttachOutcome::Closed) {
                    break;
                }
            }
            other => {
                send(&out_tx, &Message::Error { message: format!("unexpected message: {other:?}") });
            }
        }
    }

    Ok(())
}

enum AttachOutcome {
    /// The client sent `Detach`; the connection returns to top-level dispatch.
    Detached,
    /// The session ended; `SessionExited` was already sent.
    SessionExited,
    /// The socket closed while attached.
    Closed,
}

/// Runs the attached phase of a connection: one forwarder task streaming
/// `Subscribe()` chunks as `Output` frames, and this task itself reading
/// client frames and dispatching `Input`/`Resize`/`Detach`/`RequestScreen`
/// (§4.6).
#[allow(clippy::too_many_arguments)]
async fn run_attached<R: AsyncRead + Unpin>(
    read_half: &mut R,
    decoder: &mut FrameDecoder,
    pending: &mut VecDeque<Message>,
    buf: &mut [u8],
    session: &Arc<Session>,
    out_tx: &mpsc::UnboundedSender<Vec<u8>>,
    output_rx: broadcast::Receiver<Chunk>,
    client_id: &str,
) -> Result<AttachOutcome, HostError> {
    let cancel = CancellationToken::new();
    let forwarder = tokio::spawn(forward_output(output_rx, out_tx.clone(), cancel.clone()));

    let outcome = loop {
        tokio::select! {
            biased;

            exit_code = session.wait_for_exit() => {
                let info = session.info();
                send(out_tx, &Message::SessionExited { id: info.id, exit: exit_code.unwrap_or(-1) });
                break Ok(AttachOutcome::SessionExited);
            }

            message = next_message(read_half, decoder, pending, buf) => {
                match message {
                    Ok(None) => break Ok(AttachOutcome::Closed),
                    Ok(Some(Message::Input(bytes))) => {
                        let _ = session.send_input(&bytes);
                    }
                    Ok(Some(Message::Resize { cols, rows })) => {
                        let _ = session.resize(cols, rows);
                    }
                    Ok(Some(Message::RequestScreen)) => {
                        let ansi = session.render_screen(None);
                        send(out_tx, &Message::ScreenContent(ansi));
                    }
                    Ok(Some(Message::Detach)) => break Ok(AttachOutcome::Detached),
                    Ok(Some(other)) => {
                        log::debug!("[{client_id}] ignoring {other:?} while attached");
                    }
                    Err(err) => break Err(err),
                }
            }
        }
    };

    cancel.cancel();
    let _ = forwarder.await;
    outcome
}

async fn forward_output(
    mut output_rx: broadcast::Receiver<Chunk>,
    out_tx: mpsc::UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = output_rx.recv() => {
                match received {
                    Ok(chunk) => {
                        if out_tx.send(encode_frame(&Message::Output(chunk.to_vec()))).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn writer_task<W: AsyncWrite + Unpin>(mut write_half: W, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = rx.recv().await {
        if write_half.write_all(&frame).await.is_err() {
            break;
        }
    }
}

async fn next_message<R: AsyncRead + Unpin>(
    read_half: &mut R,
    decoder: &mut FrameDecoder,
    pending: &mut VecDeque<Message>,
    buf: &mut [u8],
) -> Result<Option<Message>, HostError> {
    loop {
        if let Some(message) = pending.pop_front() {
            return Ok(Some(message));
        }
        let n = read_half.read(buf).await.map_err(HostError::Transport)?;
        if n == 0 {
            return Ok(None);
        }
        let messages: Result<Vec<Message>, DecodeError> = decoder.feed(&buf[..n]);
        pending.extend(messages?);
    }
}

fn send(out_tx: &mpsc::UnboundedSender<Vec<u8>>, message: &Message) {
    let _ = out_tx.send(encode_frame(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn recv_frame(stream: &mut tokio::io::DuplexStream, decoder: &mut FrameDecoder) -> Message {
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "peer closed before sending a frame");
            let mut messages = decoder.feed(&buf[..n]).unwrap();
            if !messages.is_empty() {
                return messages.remove(0);
            }
        }
    }

    async fn recv_frame_timeout(stream: &mut tokio::io::DuplexStream, decoder: &mut FrameDecoder) -> Option<Message> {
        tokio::time::timeout(Duration::from_millis(50), recv_frame(stream, decoder)).await.ok()
    }

    #[tokio::test]
    async fn full_session_lifecycle_over_the_wire() {
        let registry = Arc::new(SessionRegistry::new(10));
        let options = Arc::new(HostOptions { default_buffer_size: 4096, ..HostOptions::default() });
        let (mut client_side, host_side) = tokio::io::duplex(64 * 1024);

        let handle = tokio::spawn(run(Box::new(host_side), registry, options, "test"));
        let mut decoder = FrameDecoder::new();

        let hello = recv_frame(&mut client_side, &mut decoder).await;
        assert!(matches!(hello, Message::Hello { version } if version == HostOptions::PROTOCOL_VERSION));
        client_side
            .write_all(&encode_frame(&Message::Hello { version: HostOptions::PROTOCOL_VERSION }))
            .await
            .unwrap();

        client_side
            .write_all(&encode_frame(&Message::CreateSession {
                id: "main".to_string(),
                cmd: "/bin/cat".to_string(),
                args: None,
                cwd: None,
                env: None,
                cols: 80,
                rows: 24,
            }))
            .await
            .unwrap();
        match recv_frame(&mut client_side, &mut decoder).await {
            Message::SessionCreated { info } => assert_eq!(info.id, "main"),
            other => panic!("expected SessionCreated, got {other:?}"),
        }

        client_side
            .write_all(&encode_frame(&Message::Attach { id: "main".to_string(), cols: 80, rows: 24 }))
            .await
            .unwrap();
        let attached = recv_frame(&mut client_side, &mut decoder).await;
        assert!(matches!(attached, Message::Attached { .. }));

        client_side.write_all(&encode_frame(&Message::Input(b"hi\n".to_vec()))).await.unwrap();

        let mut saw_output = false;
        for _ in 0..100 {
            if let Some(Message::Output(bytes)) = recv_frame_timeout(&mut client_side, &mut decoder).await {
                if bytes.windows(2).any(|w| w == b"hi") {
                    saw_output = true;
                    break;
                }
            }
        }
        assert!(saw_output, "expected to observe echoed input as an Output frame");

        client_side.write_all(&encode_frame(&Message::Detach)).await.unwrap();
        client_side
            .write_all(&encode_frame(&Message::KillSession { id: "main".to_string(), force: true }))
            .await
            .unwrap();

        drop(client_side);
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    #[tokio::test]
    async fn attach_to_unknown_session_reports_an_error() {
        let registry = Arc::new(SessionRegistry::new(10));
        let options = Arc::new(HostOptions::default());
        let (mut client_side, host_side) = tokio::io::duplex(16 * 1024);

        let _handle = tokio::spawn(run(Box::new(host_side), registry, options, "test"));
        let mut decoder = FrameDecoder::new();

        let _hello = recv_frame(&mut client_side, &mut decoder).await;
        client_side
            .write_all(&encode_frame(&Message::Hello { version: HostOptions::PROTOCOL_VERSION }))
            .await
            .unwrap();

        client_side
            .write_all(&encode_frame(&Message::Attach { id: "ghost".to_string(), cols: 80, rows: 24 }))
            .await
            .unwrap();

        match recv_frame(&mut client_side, &mut decoder).await {
            Message::Error { message } => assert!(message.contains("ghost")),
            other => panic!("expected Error, got {other:?}"),
        }
    }
}
