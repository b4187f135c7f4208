//! Background change watcher.
//!
//! Polls the resolver at a fixed interval. Each detected change becomes the
//! active unit, gets a fresh snapshot, and is published to every streaming
//! client:
//!
//! ```text
//! last_updated() --> ActiveUnit::set --> snapshot() --> EventHub::publish
//! ```
//!
//! A failing iteration (including a panicking resolver) is logged and the loop
//! keeps going. Only the shutdown signal stops it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::ShutdownSignal;
use crate::logger::{status_error, status_success};
use crate::stream::{BroadcastMessage, EventHub};
use crate::unit::{ActiveUnit, DerivedData, UnitName, UnitResolver, snapshot};

/// Polls a resolver and turns changes into broadcast updates.
pub struct ChangeWatcher {
    resolver: Arc<dyn UnitResolver>,
    active: Arc<ActiveUnit>,
    hub: Arc<EventHub>,
    poll_interval: Duration,
    compute_timeout: Duration,
}

impl ChangeWatcher {
    pub fn new(
        resolver: Arc<dyn UnitResolver>,
        active: Arc<ActiveUnit>,
        hub: Arc<EventHub>,
        poll_interval: Duration,
        compute_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            active,
            hub,
            poll_interval,
            compute_timeout,
        }
    }

    pub fn from_config(
        resolver: Arc<dyn UnitResolver>,
        active: Arc<ActiveUnit>,
        hub: Arc<EventHub>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            resolver,
            active,
            hub,
            config.watch.poll_interval(),
            config.watch.compute_timeout(),
        )
    }

    /// Run one polling iteration.
    ///
    /// Returns the published update, or `None` when nothing changed. A
    /// panicking iteration publishes an error snapshot for the active unit.
    pub fn poll_once(&self) -> Option<BroadcastMessage> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.detect_and_publish())) {
            Ok(published) => published,
            Err(payload) => {
                let message = format!("watcher failed: {}", panic_message(payload.as_ref()));
                crate::log!("error"; "{}", message);

                let data = DerivedData::failure(self.active.get().as_ref(), message);
                let msg = BroadcastMessage::update(&data);
                self.hub.publish(msg.clone());
                Some(msg)
            }
        }
    }

    fn detect_and_publish(&self) -> Option<BroadcastMessage> {
        let path = self.resolver.last_updated()?;
        let Some(unit) = UnitName::from_path(&path) else {
            crate::debug!("watch"; "ignoring change without a unit name: {}", path.display());
            return None;
        };

        crate::debug!("watch"; "changed: {}", path.display());
        self.active.set(unit.clone());

        let data = snapshot(&self.resolver, &unit, self.compute_timeout);
        match data.error() {
            Some(err) => status_error(&format!("{unit} failed"), err),
            None => status_success(&format!("{unit} updated")),
        }

        let msg = BroadcastMessage::update(&data);
        let clients = self.hub.publish(msg.clone());
        crate::debug!("watch"; "published {} to {} client(s)", unit, clients);
        Some(msg)
    }

    /// Poll until `shutdown` fires.
    pub fn run(self, shutdown: ShutdownSignal) {
        crate::debug!("watch"; "polling every {:?}", self.poll_interval);
        loop {
            self.poll_once();
            if shutdown.wait_timeout(self.poll_interval) {
                break;
            }
        }
        crate::debug!("watch"; "stopped");
    }

    /// Run on a dedicated background thread.
    pub fn spawn(self, shutdown: ShutdownSignal) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("change-watcher".into())
            .spawn(move || self.run(shutdown))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests;
