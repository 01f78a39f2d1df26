use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::session::SessionHandle;

/// Periodically forces the session to drop and resume its connection.
///
/// Keeps the replay path exercised under real conditions. Disarm it when
/// recording stops; dropping the timer disarms it as well.
pub struct ForcedReconnectTimer {
    task: Option<JoinHandle<()>>,
}

impl ForcedReconnectTimer {
    pub fn arm(handle: SessionHandle, period: Duration) -> Self {
        info!("Forcing a reconnect every {:?}", period);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if handle.is_finished() {
                    debug!("Session finished, forced reconnect timer exiting");
                    break;
                }
                handle.force_reconnect();
            }
        });

        Self { task: Some(task) }
    }

    /// Stop forcing reconnects. Consumes the timer so it can only happen once.
    pub fn disarm(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Forced reconnect timer disarmed");
        }
    }
}

impl Drop for ForcedReconnectTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
