use crate::wire::{DecodeError, Reader, Writer};

/// Wire values for each frame's `type` byte.
pub mod message_type {
    pub const HELLO: u8 = 1;
    pub const LIST_SESSIONS: u8 = 2;
    pub const SESSION_LIST: u8 = 3;
    pub const CREATE_SESSION: u8 = 4;
    pub const SESSION_CREATED: u8 = 5;
    pub const ATTACH: u8 = 6;
    pub const ATTACHED: u8 = 7;
    pub const DETACH: u8 = 8;
    pub const INPUT: u8 = 9;
    pub const OUTPUT: u8 = 10;
    pub const RESIZE: u8 = 11;
    pub const KILL_SESSION: u8 = 12;
    pub const SESSION_EXITED: u8 = 13;
    pub const REQUEST_SCREEN: u8 = 14;
    pub const SCREEN_CONTENT: u8 = 15;
    pub const ERROR: u8 = 16;
}

/// Lifecycle state of a session, as reported over the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WireSessionState {
    Starting = 0,
    Running = 1,
    Exited = 2,
    Failed = 3,
}

impl WireSessionState {
    fn from_u8(byte: u8) -> Result<WireSessionState, DecodeError> {
        match byte {
            0 => Ok(WireSessionState::Starting),
            1 => Ok(WireSessionState::Running),
            2 => Ok(WireSessionState::Exited),
            3 => Ok(WireSessionState::Failed),
            other => Err(DecodeError::InvalidState(other)),
        }
    }
}

/// `{id, cmd, cwd, state, created, exit, cols, rows}` as carried by
/// `SessionCreated`, `SessionList`, and `Attached`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SessionInfo {
    pub id: String,
    pub cmd: String,
    pub cwd: Option<String>,
    pub state: WireSessionState,
    pub created_ms: i64,
    pub exit: Option<i32>,
    pub cols: u16,
    pub rows: u16,
}

impl SessionInfo {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.put_string(&self.id);
        buf.put_string(&self.cmd);
        buf.put_option(&self.cwd, |b, v| b.put_string(v));
        buf.put_u8(self.state as u8);
        buf.put_i64(self.created_ms);
        buf.put_option(&self.exit, |b, v| b.put_i32(*v));
        buf.put_u16(self.cols);
        buf.put_u16(self.rows);
    }

    fn read(r: &mut Reader) -> Result<SessionInfo, DecodeError> {
        Ok(SessionInfo {
            id: r.string()?,
            cmd: r.string()?,
            cwd: r.option(Reader::string)?,
            state: WireSessionState::from_u8(r.u8()?)?,
            created_ms: r.i64()?,
            exit: r.option(Reader::i32)?,
            cols: r.u16()?,
            rows: r.u16()?,
        })
    }
}

/// A decoded protocol message, independent of its frame type byte.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Message {
    Hello { version: u8 },
    ListSessions,
    SessionList { sessions: Vec<SessionInfo> },
    CreateSession {
        id: String,
        cmd: String,
        args: Option<Vec<String>>,
        cwd: Option<String>,
        env: Option<Vec<(String, String)>>,
        cols: u16,
        rows: u16,
    },
    SessionCreated { info: SessionInfo },
    Attach { id: String, cols: u16, rows: u16 },
    Attached { info: SessionInfo, buffered: Vec<u8> },
    Detach,
    Input(Vec<u8>),
    Output(Vec<u8>),
    Resize { cols: u16, rows: u16 },
    KillSession { id: String, force: bool },
    SessionExited { id: String, exit: i32 },
    RequestScreen,
    ScreenContent(Vec<u8>),
    Error { message: String },
}

impl Message {
    #[must_use]
    pub fn type_byte(&self) -> u8 {
        use message_type::*;
        match self {
            Message::Hello { .. } => HELLO,
            Message::ListSessions => LIST_SESSIONS,
            Message::SessionList { .. } => SESSION_LIST,
            Message::CreateSession { .. } => CREATE_SESSION,
            Message::SessionCreated { .. } => SESSION_CREATED,
            Message::Attach { .. } => ATTACH,
            Message::Attached { .. } => ATTACHED,
            Message::Detach => DETACH,
            Message::Input(_) => INPUT,
            Message::Output(_) => OUTPUT,
            Message::Resize { .. } => RESIZE,
            Message::KillSession { .. } => KILL_SESSION,
            Message::SessionExited { .. } => SESSION_EXITED,
            Message::RequestScreen => REQUEST_SCREEN,
            Message::ScreenContent(_) => SCREEN_CONTENT,
            Message::Error { .. } => ERROR,
        }
    }

    /// Encodes the payload only; the caller (or [`crate::encode_frame`])
    /// supplies the `type:u8 | length:u32_be` framing.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Message::Hello { version } => buf.put_u8(*version),
            Message::ListSessions | Message::Detach | Message::RequestScreen => {}
            Message::SessionList { sessions } => {
                buf.put_list(sessions, |b, info| info.write(b));
            }
            Message::CreateSession { id, cmd, args, cwd, env, cols, rows } => {
                buf.put_string(id);
                buf.put_string(cmd);
                buf.put_option(args, |b, list| b.put_list(list, |b, s| b.put_string(s)));
                buf.put_option(cwd, |b, v| b.put_string(v));
                buf.put_option(env, |b, pairs| {
                    b.put_list(pairs, |b, (k, v)| {
                        b.put_string(k);
                        b.put_string(v);
                    });
                });
                buf.put_u16(*cols);
                buf.put_u16(*rows);
            }
            Message::SessionCreated { info } => info.write(&mut buf),
            Message::Attach { id, cols, rows } => {
                buf.put_string(id);
                buf.put_u16(*cols);
                buf.put_u16(*rows);
            }
            Message::Attached { info, buffered } => {
                info.write(&mut buf);
                buf.put_bytes(buffered);
            }
            Message::Input(bytes) | Message::Output(bytes) | Message::ScreenContent(bytes) => {
                buf.extend_from_slice(bytes);
            }
            Message::Resize { cols, rows } => {
                buf.put_u16(*cols);
                buf.put_u16(*rows);
            }
            Message::KillSession { id, force } => {
                buf.put_string(id);
                buf.put_bool(*force);
            }
            Message::SessionExited { id, exit } => {
                buf.put_string(id);
                buf.put_i32(*exit);
            }
            Message::Error { message } => buf.put_string(message),
        }
        buf
    }

    /// Decodes a message given its frame type byte and payload.
    pub fn decode(type_byte: u8, payload: &[u8]) -> Result<Message, DecodeError> {
        let mut r = Reader::new(payload);
        let message = match type_byte {
            message_type::HELLO => Message::Hello { version: r.u8()? },
            message_type::LIST_SESSIONS => Message::ListSessions,
            message_type::SESSION_LIST => Message::SessionList {
                sessions: r.list(SessionInfo::read)?,
            },
            message_type::CREATE_SESSION => Message::CreateSession {
                id: r.string()?,
                cmd: r.string()?,
                args: r.option(|r| r.list(Reader::string))?,
                cwd: r.option(Reader::string)?,
                env: r.option(|r| {
                    r.list(|r| {
                        let k = r.string()?;
                        let v = r.string()?;
                        Ok((k, v))
                    })
                })?,
                cols: r.u16()?,
                rows: r.u16()?,
            },
            message_type::SESSION_CREATED => Message::SessionCreated { info: SessionInfo::read(&mut r)? },
            message_type::ATTACH => Message::Attach {
                id: r.string()?,
                cols: r.u16()?,
                rows: r.u16()?,
            },
            message_type::ATTACHED => Message::Attached {
                info: SessionInfo::read(&mut r)?,
                buffered: r.bytes()?,
            },
            message_type::DETACH => Message::Detach,
            message_type::INPUT => Message::Input(r.remaining().to_vec()),
            message_type::OUTPUT => Message::Output(r.remaining().to_vec()),
            message_type::RESIZE => Message::Resize { cols: r.u16()?, rows: r.u16()? },
            message_type::KILL_SESSION => Message::KillSession { id: r.string()?, force: r.bool()? },
            message_type::SESSION_EXITED => Message::SessionExited { id: r.string()?, exit: r.i32()? },
            message_type::REQUEST_SCREEN => Message::RequestScreen,
            message_type::SCREEN_CONTENT => Message::ScreenContent(r.remaining().to_vec()),
            message_type::ERROR => Message::Error { message: r.string()? },
            other => return Err(DecodeError::UnknownMessageType(other)),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> SessionInfo {
        SessionInfo {
            id: "main".to_string(),
            cmd: "bash".to_string(),
            cwd: Some("/home/user".to_string()),
            state: WireSessionState::Running,
            created_ms: 1_732_000_000_000,
            exit: None,
            cols: 80,
            rows: 24,
        }
    }

    #[test]
    fn create_session_round_trips() {
        let msg = Message::CreateSession {
            id: "a".to_string(),
            cmd: "zsh".to_string(),
            args: Some(vec!["-l".to_string()]),
            cwd: None,
            env: Some(vec![("TERM".to_string(), "xterm-256color".to_string())]),
            cols: 120,
            rows: 40,
        };
        let payload = msg.encode_payload();
        let decoded = Message::decode(msg.type_byte(), &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn attached_round_trips_with_negative_exit_and_unicode() {
        let mut info = sample_info();
        info.exit = Some(-1);
        info.cmd = "日本語".to_string();
        let msg = Message::Attached { info, buffered: vec![0, 1, 2, 255] };
        let payload = msg.encode_payload();
        let decoded = Message::decode(message_type::ATTACHED, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn empty_session_list_round_trips() {
        let msg = Message::SessionList { sessions: Vec::new() };
        let payload = msg.encode_payload();
        let decoded = Message::decode(message_type::SESSION_LIST, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn unknown_type_byte_errors() {
        assert_eq!(Message::decode(0xEE, &[]), Err(DecodeError::UnknownMessageType(0xEE)));
    }
}
