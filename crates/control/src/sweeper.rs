use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use crate::cooldown::Cooldowns;

const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Periodically forgets clients whose cooldown has expired so the table
/// stays bounded by the number of recently active clients.
pub struct CooldownSweeper {
    cooldowns: Cooldowns,
    period: Duration,
}

impl CooldownSweeper {
    pub fn new(cooldowns: Cooldowns) -> Self {
        Self {
            cooldowns,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(10));
        self
    }

    #[instrument(skip(self))]
    pub async fn start(&self) {
        if !self.cooldowns.is_enabled() {
            info!("Client cooldown disabled, sweeper not started");
            return;
        }
        info!("Starting cooldown sweeper every {:?}", self.period);

        let mut interval = interval(self.period);
        loop {
            interval.tick().await;
            self.cooldowns.prune();
        }
    }
}
