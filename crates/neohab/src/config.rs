//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a client instance.
///
/// Field names deserialize in camelCase, so the conventional
/// `{ "shouldReconnect": false }` object maps straight onto this struct.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Reconnect once, immediately, every time the stream ends.
    pub should_reconnect: bool,

    /// Pacing delay applied by `send()` before each write.
    pub send_delay_ms: u64,

    /// Spacing between ghost polls while corporating.
    pub corporation_poll_ms: u64,

    /// Polls allowed before corporation gives up.
    pub corporation_max_polls: u32,

    /// How long to wait after `CORPORATE` for remote clients to render the
    /// new avatar.
    pub corporation_settle_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            should_reconnect: true,
            send_delay_ms: 500,
            corporation_poll_ms: 2_000,
            corporation_max_polls: 5,
            corporation_settle_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// `send_delay_ms` as a [`Duration`].
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }

    /// `corporation_poll_ms` as a [`Duration`].
    pub fn corporation_poll(&self) -> Duration {
        Duration::from_millis(self.corporation_poll_ms)
    }

    /// `corporation_settle_ms` as a [`Duration`].
    pub fn corporation_settle(&self) -> Duration {
        Duration::from_millis(self.corporation_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.should_reconnect);
        assert_eq!(config.corporation_poll(), Duration::from_secs(2));
        assert_eq!(config.corporation_max_polls, 5);
        assert_eq!(config.corporation_settle(), Duration::from_secs(10));
    }

    #[test]
    fn test_camel_case_object_with_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "shouldReconnect": false }"#).unwrap();
        assert!(!config.should_reconnect);
        assert_eq!(config.send_delay_ms, 500);
    }
}
