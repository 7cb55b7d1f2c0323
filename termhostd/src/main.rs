use clap::Parser;
use env_logger::Env;

use termhostd::{Host, HostOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let options = HostOptions::parse();
    log::info!(
        "starting termhostd (max_sessions={}, buffer={}B)",
        options.max_sessions,
        options.default_buffer_size
    );

    Host::new(options).run().await
}
