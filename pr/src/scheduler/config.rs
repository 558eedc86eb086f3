//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle knobs that sit outside the model budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrompterConfig {
    /// Drain-poll period in milliseconds
    #[serde(rename = "drain-poll-ms", default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,

    /// Call `Store::save` after every successful send
    #[serde(rename = "persist-results", default = "default_persist_results")]
    pub persist_results: bool,

    /// Lifecycle event channel buffer size
    #[serde(rename = "event-buffer", default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_drain_poll_ms() -> u64 {
    1000
}

fn default_persist_results() -> bool {
    true
}

fn default_event_buffer() -> usize {
    32
}

impl Default for PrompterConfig {
    fn default() -> Self {
        Self {
            drain_poll_ms: default_drain_poll_ms(),
            persist_results: default_persist_results(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl PrompterConfig {
    /// Get the drain-poll period as a Duration
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrompterConfig::default();
        assert_eq!(config.drain_poll_ms, 1000);
        assert!(config.persist_results);
        assert_eq!(config.event_buffer, 32);
        assert_eq!(config.drain_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml() {
        let config: PrompterConfig = serde_yaml::from_str("persist-results: false\n").unwrap();
        assert!(!config.persist_results);
        assert_eq!(config.drain_poll_ms, 1000);
    }
}
