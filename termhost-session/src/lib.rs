mod error;
mod registry;
mod ring_buffer;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use ring_buffer::RingBuffer;
pub use session::{Chunk, Session, SessionInfo, SessionOptions, SessionState, SUBSCRIBER_CAPACITY};
