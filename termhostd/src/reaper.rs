use std::sync::Arc;
use std::time::Duration;

use termhost_session::SessionRegistry;

/// Low-frequency tick that kills sessions whose `is_idle_timed_out()` is
/// true (§4.6: "at least once per minute"; the host defaults to every 30s).
pub async fn run(registry: Arc<SessionRegistry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        registry.reap_idle();
    }
}
