use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

use super::backend::TsdbBackend;

/// Background task that drops buckets once they leave their retention window
pub struct RetentionSweeper {
    store: Arc<dyn TsdbBackend>,
    every: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn TsdbBackend>, every: Duration) -> Self {
        RetentionSweeper { store, every }
    }

    /// Evict against the store's current time
    pub fn sweep_once(&self) -> usize {
        let now = self.store.now();
        let removed = self.store.evict_expired(now);
        debug!(removed, now, "retention sweep");
        removed
    }

    pub async fn run(self) {
        let mut tick = interval(self.every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;
            self.sweep_once();
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
