mod client;
mod error;
mod host;
mod options;
mod reaper;
mod transport;
mod wire_convert;

pub use error::HostError;
pub use host::Host;
pub use options::HostOptions;
