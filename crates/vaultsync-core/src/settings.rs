//! Timing settings of a dashboard session.

use crate::fetch::DEFAULT_LOADING_DELAY;
use crate::search_params::DEFAULT_SEARCH_DEBOUNCE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs, deserialized from the `[sync]` table of the frontend config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Quiet period before typed search text triggers a fetch.
    pub search_debounce_ms: u64,
    /// How long a fetch may run before the loading flag is raised.
    pub loading_delay_ms: u64,
    /// Vault status poll interval. Zero disables polling after mount.
    pub status_poll_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
            loading_delay_ms: DEFAULT_LOADING_DELAY.as_millis() as u64,
            status_poll_secs: 30,
        }
    }
}

impl SyncSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }

    pub fn status_poll_interval(&self) -> Option<Duration> {
        (self.status_poll_secs > 0).then(|| Duration::from_secs(self.status_poll_secs))
    }
}
