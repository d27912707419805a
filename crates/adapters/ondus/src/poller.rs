//! Background polling of one appliance.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use ondushub_app::ports::PlatformContext;

use crate::appliance::Appliance;

/// Drives the periodic refresh of one appliance.
pub(crate) struct Poller<C> {
    appliance: Arc<Appliance<C>>,
    ticks: u64,
}

impl<C: PlatformContext + 'static> Poller<C> {
    pub(crate) fn new(appliance: Arc<Appliance<C>>) -> Self {
        Self {
            appliance,
            ticks: 0,
        }
    }

    /// One polling round. The first round replays the measurement history;
    /// every later round starts by refreshing the appliance info.
    pub(crate) async fn tick(&mut self) {
        let base = self.appliance.base();
        tracing::debug!(appliance = %base.name(), tick = self.ticks, "polling appliance");
        if self.ticks == 0 {
            self.appliance.replay_history().await;
        } else {
            base.refresh_info().await;
        }
        self.appliance.poll().await;
        self.ticks += 1;
    }

    /// Poll immediately, then every `interval`.
    pub(crate) fn spawn(mut self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.tick().await;
                tokio::time::sleep(interval).await;
            }
        })
    }
}
