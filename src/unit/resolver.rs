//! The resolver capability and hardened snapshot computation.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use serde_json::{Map, Value};

use super::{ActiveUnit, DerivedData, UnitError, UnitName, WatchTarget};

/// Answers "which unit changed most recently" and "what is unit X's data".
///
/// Implementations are shared between the watcher thread and request
/// handlers, so they must be internally synchronized.
pub trait UnitResolver: Send + Sync {
    /// The watched file or directory.
    fn target(&self) -> &WatchTarget;

    /// Available unit names, sorted.
    fn units(&self) -> Vec<UnitName>;

    /// Path of the most recently modified unit, if it changed since the
    /// previous call. `None` is the no-change sentinel.
    fn last_updated(&self) -> Option<PathBuf>;

    /// Compute the payload for a unit.
    fn compute(&self, unit: &UnitName) -> anyhow::Result<Map<String, Value>>;
}

/// Compute a unit's data on a helper thread, bounded by `timeout`.
///
/// Errors, panics and timeouts all become error-flagged snapshots. On timeout
/// the helper thread is abandoned and its result discarded.
pub fn snapshot(
    resolver: &Arc<dyn UnitResolver>,
    unit: &UnitName,
    timeout: Duration,
) -> DerivedData {
    let (tx, rx) = channel::bounded(1);
    let worker = Arc::clone(resolver);
    let name = unit.clone();

    let spawned = thread::Builder::new()
        .name(format!("compute-{unit}"))
        .spawn(move || {
            let _ = tx.send(worker.compute(&name));
        });

    if let Err(e) = spawned {
        return DerivedData::failure(Some(unit), format!("failed to spawn compute thread: {e}"));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(payload)) => DerivedData::success(unit, payload),
        Ok(Err(e)) => DerivedData::failure(Some(unit), format!("{e:#}")),
        Err(RecvTimeoutError::Timeout) => DerivedData::failure(
            Some(unit),
            UnitError::Timeout(unit.to_string(), timeout).to_string(),
        ),
        // Sender dropped without sending: the compute call panicked
        Err(RecvTimeoutError::Disconnected) => {
            DerivedData::failure(Some(unit), UnitError::Panicked(unit.to_string()).to_string())
        }
    }
}

/// Pick the unit a request should see.
///
/// - single-file target: always that file
/// - explicit selector: that unit, if it exists
/// - otherwise: the watcher's last detected unit, then the first available one
pub fn view_unit(
    resolver: &dyn UnitResolver,
    active: &ActiveUnit,
    selector: Option<&str>,
) -> Result<UnitName, UnitError> {
    let target = resolver.target();
    if !target.is_dir() {
        return UnitName::from_path(target.path())
            .ok_or_else(|| UnitError::NoUnits(target.path().to_path_buf()));
    }

    let units = resolver.units();

    if let Some(selected) = selector.filter(|s| !s.is_empty()) {
        return units
            .into_iter()
            .find(|u| u.as_str() == selected)
            .ok_or_else(|| UnitError::UnknownUnit(selected.to_string()));
    }

    if let Some(last) = active.get()
        && units.contains(&last)
    {
        return Ok(last);
    }

    units
        .into_iter()
        .next()
        .ok_or_else(|| UnitError::NoUnits(target.path().to_path_buf()))
}

/// `view_unit` + `snapshot`, with selection failures folded into the snapshot.
pub fn view_snapshot(
    resolver: &Arc<dyn UnitResolver>,
    active: &ActiveUnit,
    selector: Option<&str>,
    timeout: Duration,
) -> DerivedData {
    match view_unit(resolver.as_ref(), active, selector) {
        Ok(unit) => snapshot(resolver, &unit, timeout),
        Err(e) => DerivedData::failure(None, e.to_string()),
    }
}
