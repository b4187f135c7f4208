//! Filesystem unit resolver.
//!
//! Change detection polls modification times: every `last_updated` call scans
//! the candidates and reports the newest one if it moved past what was seen
//! before. Computation either parses the unit file directly (`.json`, `.toml`)
//! or runs the configured compute command and reads JSON from its stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::{UnitError, UnitName, UnitResolver, WatchTarget};
use crate::config::AppConfig;
use crate::utils::exec::Cmd;

/// A candidate unit file and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Seen {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Filesystem-backed `UnitResolver`.
pub struct UnitManager {
    target: WatchTarget,
    /// Accepted extensions (lowercase, no dot) for directory targets
    extensions: Vec<String>,
    /// Compute command; empty means built-in parsing
    command: Vec<String>,
    /// Overdue compute commands are killed after this long
    command_timeout: Option<Duration>,
    /// Newest unit observed by the previous poll
    last_seen: Mutex<Option<Seen>>,
}

impl UnitManager {
    /// Create a manager and prime change detection with the current state.
    pub fn new(target: WatchTarget, extensions: Vec<String>, command: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        let manager = Self {
            target,
            extensions,
            command,
            command_timeout: None,
            last_seen: Mutex::new(None),
        };
        let initial = newest(&manager.candidates()).cloned();
        *manager.last_seen.lock() = initial;
        manager
    }

    pub fn from_config(target: WatchTarget, config: &AppConfig) -> Self {
        Self::new(
            target,
            config.watch.extensions.clone(),
            config.compute.command.clone(),
        )
        .with_command_timeout(config.watch.compute_timeout())
    }

    /// Kill a compute command that runs longer than `timeout`.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Candidate unit files with their mtimes.
    fn candidates(&self) -> Vec<Seen> {
        if !self.target.is_dir() {
            return mtime_of(self.target.path()).into_iter().collect();
        }

        let Ok(entries) = fs::read_dir(self.target.path()) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.accepts(path))
            .filter_map(|path| mtime_of(&path))
            .collect()
    }

    fn accepts(&self, path: &Path) -> bool {
        if is_temp_file(path) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// File backing a unit name.
    ///
    /// Files sharing a stem (`a.json`, `a.toml`) are one unit; the most
    /// recently modified one backs it.
    fn unit_path(&self, unit: &UnitName) -> Result<PathBuf, UnitError> {
        let matching: Vec<_> = self
            .candidates()
            .into_iter()
            .filter(|seen| UnitName::from_path(&seen.path).as_ref() == Some(unit))
            .collect();
        if matching.len() > 1 {
            crate::debug!("watch"; "{} files share unit name `{}`, using the newest", matching.len(), unit);
        }
        newest(&matching)
            .map(|seen| seen.path.clone())
            .ok_or_else(|| UnitError::UnknownUnit(unit.to_string()))
    }

    fn compute_command(&self, unit: &UnitName, path: &Path) -> Result<Map<String, Value>> {
        let vars = unit_vars(unit, path, self.target.dir());
        let args = resolve_args(&self.command, &vars);

        let mut cmd = Cmd::from_slice(&args)
            .cwd(self.target.dir())
            .envs(vars.iter().map(|(k, v)| (format!("LIVEWATCH_{k}"), v.clone())));
        if let Some(timeout) = self.command_timeout {
            cmd = cmd.timeout(timeout);
        }
        let output = cmd.run()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UnitError::Command {
                unit: unit.to_string(),
                detail: format!("{}\n{}", output.status, stderr.trim()),
            }
            .into());
        }

        let value: Value = serde_json::from_slice(&output.stdout).map_err(|e| UnitError::Command {
            unit: unit.to_string(),
            detail: format!("stdout is not valid JSON: {e}"),
        })?;
        into_object(value, path)
    }
}

impl UnitResolver for UnitManager {
    fn target(&self) -> &WatchTarget {
        &self.target
    }

    fn units(&self) -> Vec<UnitName> {
        let mut names: Vec<_> = self
            .candidates()
            .iter()
            .filter_map(|seen| UnitName::from_path(&seen.path))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn last_updated(&self) -> Option<PathBuf> {
        let candidates = self.candidates();
        let mut last = self.last_seen.lock();
        let changed = detect_change(&candidates, last.as_ref())?;
        let path = changed.path.clone();
        *last = Some(changed);
        Some(path)
    }

    fn compute(&self, unit: &UnitName) -> Result<Map<String, Value>> {
        let path = self.unit_path(unit)?;
        if self.command.is_empty() {
            parse_unit_file(&path)
        } else {
            self.compute_command(unit, &path)
        }
    }
}

// =============================================================================
// Change detection
// =============================================================================

/// Newest candidate; ties are broken by path so the choice is stable.
pub(crate) fn newest(candidates: &[Seen]) -> Option<&Seen> {
    candidates
        .iter()
        .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
}

/// Report the newest candidate if it differs from the previous observation.
///
/// A change is either a strictly newer mtime than anything seen before, or
/// the same file as before with a different mtime (e.g. mtime set backwards).
/// Deleting the newest file is not a change.
pub(crate) fn detect_change(candidates: &[Seen], last: Option<&Seen>) -> Option<Seen> {
    let newest = newest(candidates)?;
    let changed = match last {
        None => true,
        Some(last) => {
            newest.modified > last.modified
                || (newest.path == last.path && newest.modified != last.modified)
        }
    };
    changed.then(|| newest.clone())
}

fn mtime_of(path: &Path) -> Option<Seen> {
    let modified = path.metadata().and_then(|m| m.modified()).ok()?;
    Some(Seen {
        path: path.to_path_buf(),
        modified,
    })
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

// =============================================================================
// Computation
// =============================================================================

/// Built-in computation: parse the unit file by extension.
fn parse_unit_file(path: &Path) -> Result<Map<String, Value>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let content = fs::read_to_string(path).map_err(|e| UnitError::Io(path.to_path_buf(), e))?;

    let value = match ext.as_str() {
        "json" => serde_json::from_str::<Value>(&content).map_err(|e| UnitError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        "toml" => {
            let table: toml::Table = toml::from_str(&content).map_err(|e| UnitError::Parse {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;
            serde_json::to_value(table)
                .with_context(|| format!("failed to convert `{}` to JSON", path.display()))?
        }
        _ => return Err(UnitError::UnsupportedExtension(path.to_path_buf()).into()),
    };

    into_object(value, path)
}

fn into_object(value: Value, path: &Path) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(UnitError::Parse {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }
        .into()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Placeholder values for compute command arguments.
fn unit_vars(unit: &UnitName, path: &Path, dir: &Path) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    vars.insert("UNIT_NAME".into(), unit.to_string());
    vars.insert("UNIT_PATH".into(), path.display().to_string());
    vars.insert("TARGET_DIR".into(), dir.display().to_string());
    vars
}

/// Replace `$KEY` occurrences in command arguments.
fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                result = result.replace(&format!("${key}"), value);
            }
            result
        })
        .collect()
}
