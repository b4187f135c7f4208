use std::collections::VecDeque;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use super::*;
use crate::core::shutdown_channel;
use crate::stream::EventKind;
use crate::unit::{UnitManager, WatchTarget};

const TIMEOUT: Duration = Duration::from_secs(5);

enum Step {
    Idle,
    Changed(&'static str),
    Crash,
}

/// Resolver that replays a fixed sequence of polling results.
struct ScriptedResolver {
    target: WatchTarget,
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedResolver {
    fn new(temp: &TempDir, steps: Vec<Step>) -> Arc<dyn UnitResolver> {
        Arc::new(Self {
            target: WatchTarget::resolve(temp.path()).unwrap(),
            steps: Mutex::new(steps.into()),
        })
    }
}

impl UnitResolver for ScriptedResolver {
    fn target(&self) -> &WatchTarget {
        &self.target
    }

    fn units(&self) -> Vec<UnitName> {
        ["a", "b", "bad"].into_iter().map(UnitName::new).collect()
    }

    fn last_updated(&self) -> Option<PathBuf> {
        let step = self.steps.lock().pop_front().unwrap_or(Step::Idle);
        match step {
            Step::Idle => None,
            Step::Changed(name) => Some(self.target.path().join(format!("{name}.json"))),
            Step::Crash => panic!("resolver lost its mind"),
        }
    }

    fn compute(&self, unit: &UnitName) -> anyhow::Result<Map<String, Value>> {
        if unit.as_str() == "bad" {
            anyhow::bail!("cannot compute {unit}");
        }
        Ok(json!({ "name": unit.as_str() }).as_object().cloned().unwrap())
    }
}

fn watcher(resolver: Arc<dyn UnitResolver>) -> (ChangeWatcher, Arc<ActiveUnit>, Arc<EventHub>) {
    let active = Arc::new(ActiveUnit::new());
    let hub = Arc::new(EventHub::new(30, false));
    let watcher = ChangeWatcher::new(
        resolver,
        Arc::clone(&active),
        Arc::clone(&hub),
        Duration::from_millis(10),
        TIMEOUT,
    );
    (watcher, active, hub)
}

fn payload_unit(msg: &BroadcastMessage) -> String {
    let value: Value = serde_json::from_str(msg.payload()).unwrap();
    value["unit"].as_str().unwrap().to_string()
}

#[test]
fn test_no_change_publishes_nothing() {
    let temp = TempDir::new().unwrap();
    let (watcher, active, hub) = watcher(ScriptedResolver::new(&temp, vec![Step::Idle]));
    let client = hub.subscribe();

    assert!(watcher.poll_once().is_none());
    assert_eq!(active.get(), None);
    assert_eq!(client.pending(), 0);
}

#[test]
fn test_change_sets_active_and_publishes() {
    let temp = TempDir::new().unwrap();
    let (watcher, active, hub) = watcher(ScriptedResolver::new(&temp, vec![Step::Changed("b")]));
    let client = hub.subscribe();

    let msg = watcher.poll_once().unwrap();
    assert_eq!(msg.kind(), EventKind::FileUpdate);
    assert_eq!(payload_unit(&msg), "b");
    assert_eq!(active.get(), Some(UnitName::new("b")));
    assert_eq!(client.get(Duration::ZERO), Some(msg));
}

#[test]
fn test_compute_error_is_published_flagged() {
    let temp = TempDir::new().unwrap();
    let (watcher, active, _hub) =
        watcher(ScriptedResolver::new(&temp, vec![Step::Changed("bad")]));

    let msg = watcher.poll_once().unwrap();
    let value: Value = serde_json::from_str(msg.payload()).unwrap();
    assert_eq!(value["error"], json!("cannot compute bad"));
    assert_eq!(active.get(), Some(UnitName::new("bad")));
}

#[test]
fn test_panicking_iteration_does_not_stop_polling() {
    let temp = TempDir::new().unwrap();
    let steps = vec![Step::Changed("a"), Step::Crash, Step::Changed("b")];
    let (watcher, _active, hub) = watcher(ScriptedResolver::new(&temp, steps));
    let client = hub.subscribe();

    assert_eq!(payload_unit(&watcher.poll_once().unwrap()), "a");

    // the crash surfaces as an error snapshot for the last active unit
    let crashed = watcher.poll_once().unwrap();
    let value: Value = serde_json::from_str(crashed.payload()).unwrap();
    assert_eq!(value["unit"], json!("a"));
    assert!(value["error"].as_str().unwrap().contains("resolver lost its mind"));

    assert_eq!(payload_unit(&watcher.poll_once().unwrap()), "b");
    assert_eq!(client.pending(), 3);
}

#[test]
fn test_run_stops_on_shutdown() {
    let temp = TempDir::new().unwrap();
    let steps = vec![Step::Changed("a"), Step::Idle, Step::Changed("b")];
    let (watcher, active, hub) = watcher(ScriptedResolver::new(&temp, steps));
    let client = hub.subscribe();
    let (trigger, signal) = shutdown_channel();

    let handle = watcher.spawn(signal).unwrap();
    let first = client.get(TIMEOUT).unwrap();
    let second = client.get(TIMEOUT).unwrap();
    trigger.trigger();
    handle.join().unwrap();

    assert_eq!(payload_unit(&first), "a");
    assert_eq!(payload_unit(&second), "b");
    assert_eq!(active.get(), Some(UnitName::new("b")));
}

// =============================================================================
// Against the filesystem resolver
// =============================================================================

fn write_unit(dir: &Path, name: &str, body: &str, secs: u64) {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs);
    File::options().write(true).open(&path).unwrap().set_modified(mtime).unwrap();
}

#[test]
fn test_newest_of_two_changes_is_published_once() {
    let temp = TempDir::new().unwrap();
    write_unit(temp.path(), "a.json", r#"{"v": 0}"#, 0);
    write_unit(temp.path(), "b.json", r#"{"v": 0}"#, 1);

    let target = WatchTarget::resolve(temp.path()).unwrap();
    let manager: Arc<dyn UnitResolver> =
        Arc::new(UnitManager::new(target, vec!["json".into()], Vec::new()));
    let (watcher, active, hub) = watcher(manager);
    let client = hub.subscribe();

    // startup state is not a change
    assert!(watcher.poll_once().is_none());

    write_unit(temp.path(), "a.json", r#"{"v": 1}"#, 10);
    write_unit(temp.path(), "b.json", r#"{"v": 2}"#, 11);

    let msg = watcher.poll_once().unwrap();
    let value: Value = serde_json::from_str(msg.payload()).unwrap();
    assert_eq!(value["unit"], json!("b"));
    assert_eq!(value["v"], json!(2));
    assert_eq!(active.get(), Some(UnitName::new("b")));

    assert!(watcher.poll_once().is_none());
    assert_eq!(client.pending(), 1);
}
