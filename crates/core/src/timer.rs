use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TICK: Duration = Duration::from_millis(1000);

/// Advisory countdown for a session.
///
/// Nothing in the session flow reads it. It ticks down once per second,
/// stops at zero and cannot be paused or restarted.
pub struct SessionClock {
    remaining: watch::Receiver<u32>,
    handle: JoinHandle<()>,
}

impl SessionClock {
    pub fn start(total_seconds: u32) -> Self {
        let (tx, remaining) = watch::channel(total_seconds);
        let handle = tokio::spawn(async move {
            if total_seconds == 0 {
                return;
            }
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
            let mut seconds = total_seconds;
            while seconds > 0 {
                interval.tick().await;
                seconds -= 1;
                tx.send_replace(seconds);
            }
            tracing::info!("Session clock reached zero");
        });
        Self { remaining, handle }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// A receiver that sees every change of the remaining seconds.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
