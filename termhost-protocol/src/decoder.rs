use crate::message::Message;
use crate::wire::DecodeError;

/// Largest payload this decoder will buffer for before giving up (64 MiB).
///
/// Bounds memory use against a peer that sends a bogus length prefix; the
/// spec's own stress scenario only exercises up to a 64 KiB payload.
const MAX_FRAME_PAYLOAD: u32 = 64 * 1024 * 1024;

/// Encodes a complete frame: `type:u8 | length:u32_be | payload`.
#[must_use]
pub fn encode_frame(message: &Message) -> Vec<u8> {
    let payload = message.encode_payload();
    let mut out = Vec::with_capacity(1 + 4 + payload.len());
    out.push(message.type_byte());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Incremental frame decoder for a byte stream that may deliver frames
/// split across arbitrary read boundaries.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> FrameDecoder {
        FrameDecoder { buf: Vec::new() }
    }

    /// Feeds newly read bytes in and extracts every complete frame now
    /// available. Partial trailing data is kept for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Message>, DecodeError> {
        self.buf.extend_from_slice(bytes);
        let mut messages = Vec::new();

        loop {
            if self.buf.len() < 5 {
                break;
            }
            let length = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]);
            if length > MAX_FRAME_PAYLOAD {
                return Err(DecodeError::Truncated);
            }
            let total = 5 + length as usize;
            if self.buf.len() < total {
                break;
            }

            let type_byte = self.buf[0];
            let payload = &self.buf[5..total];
            let message = Message::decode(type_byte, payload)?;
            messages.push(message);
            self.buf.drain(..total);
        }

        Ok(messages)
    }

    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}
