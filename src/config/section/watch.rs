//! `[watch]` section configuration.
//!
//! Timing and buffering of change detection and event delivery.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! poll_interval_ms = 300        # How often the target is scanned
//! queue_capacity = 30           # Pending updates kept per client
//! heartbeat_ms = 1000           # keep_alive interval on idle streams
//! compute_timeout_ms = 10000    # Upper bound for one unit computation
//! replay_latest = true          # New clients receive the latest update
//! extensions = ["json", "toml"] # Unit file extensions in a directory target
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Change detection and streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_ms: u64,
    /// Bounded per-client queue size. Oldest pending update is dropped on overflow.
    pub queue_capacity: usize,
    pub heartbeat_ms: u64,
    pub compute_timeout_ms: u64,
    pub replay_latest: bool,
    /// Accepted unit extensions, without the leading dot.
    pub extensions: Vec<String>,
}

/// Field paths of `[watch]` for diagnostics.
pub struct WatchConfigFields {
    pub poll_interval_ms: FieldPath,
    pub queue_capacity: FieldPath,
    pub heartbeat_ms: FieldPath,
    pub compute_timeout_ms: FieldPath,
    pub extensions: FieldPath,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 300,
            queue_capacity: 30,
            heartbeat_ms: 1000,
            compute_timeout_ms: 10_000,
            replay_latest: true,
            extensions: vec!["json".into(), "toml".into()],
        }
    }
}

impl WatchConfig {
    pub const FIELDS: WatchConfigFields = WatchConfigFields {
        poll_interval_ms: FieldPath::new("watch.poll_interval_ms"),
        queue_capacity: FieldPath::new("watch.queue_capacity"),
        heartbeat_ms: FieldPath::new("watch.heartbeat_ms"),
        compute_timeout_ms: FieldPath::new("watch.compute_timeout_ms"),
        extensions: FieldPath::new("watch.extensions"),
    };

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub const fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.compute_timeout_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = Self::FIELDS;
        for (field, value) in [
            (fields.poll_interval_ms, self.poll_interval_ms),
            (fields.heartbeat_ms, self.heartbeat_ms),
            (fields.compute_timeout_ms, self.compute_timeout_ms),
        ] {
            if value == 0 {
                diag.error(field, "must be at least 1 millisecond");
            }
        }

        if self.queue_capacity == 0 {
            diag.error_with_hint(
                fields.queue_capacity,
                "must hold at least one message",
                "the default is 30",
            );
        }

        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            diag.error_with_hint(
                fields.extensions,
                "no unit extension configured",
                "e.g. extensions = [\"json\", \"toml\"]",
            );
        }
    }
}
