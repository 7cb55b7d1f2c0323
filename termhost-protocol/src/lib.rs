//! Binary wire protocol between a termhost client and the session host.
//!
//! Framing is symmetric in both directions: `type:u8 | length:u32_be |
//! payload[length]`, all integers big-endian. See [`Message`] for the
//! decoded form of each frame type and [`FrameDecoder`] for reassembling
//! frames out of a byte stream that may split them arbitrarily.

mod decoder;
mod message;
mod wire;

pub use decoder::{encode_frame, FrameDecoder};
pub use message::{message_type, Message, SessionInfo, WireSessionState};
pub use wire::{DecodeError, Reader, Writer};
