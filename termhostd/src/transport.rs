use tokio::io::{AsyncRead, AsyncWrite};

/// A client connection is one bidirectional byte stream (§6); the rest of
/// the host never distinguishes TCP from a Unix domain socket past accept.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> DuplexStream for T {}
