use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ocr_models::OcrError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-client minimum spacing between admitted requests.
#[derive(Clone)]
pub struct Cooldowns {
    window: Duration,
    last_admitted: Arc<DashMap<String, Instant>>,
}

impl Cooldowns {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_admitted: Arc::new(DashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Admits `client_id` and records the time, or reports how long it must wait.
    pub fn admit(&self, client_id: &str) -> Result<(), OcrError> {
        self.admit_at(client_id, Instant::now())
    }

    pub fn admit_at(&self, client_id: &str, now: Instant) -> Result<(), OcrError> {
        if !self.is_enabled() {
            return Ok(());
        }
        match self.last_admitted.entry(client_id.to_string()) {
            Entry::Occupied(mut slot) => {
                let elapsed = now.saturating_duration_since(*slot.get());
                if elapsed < self.window {
                    let remaining = self.window - elapsed;
                    // Round up so clients never retry a moment too early.
                    let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                    return Err(OcrError::CooldownActive { retry_after_secs });
                }
                slot.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        Ok(())
    }

    /// Drops entries older than the window; returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    pub fn prune_at(&self, now: Instant) -> usize {
        let before = self.last_admitted.len();
        let window = self.window;
        self.last_admitted
            .retain(|_, last| now.saturating_duration_since(*last) < window);
        let removed = before.saturating_sub(self.last_admitted.len());
        if removed > 0 {
            debug!("Pruned {} expired cooldown entries", removed);
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.last_admitted.len()
    }
}
