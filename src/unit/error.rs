//! Unit resolution errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to locate or compute a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("watch target `{0}` not found")]
    NotFound(PathBuf, #[source] std::io::Error),

    #[error("unknown unit `{0}`")]
    UnknownUnit(String),

    #[error("no units found in `{0}`")]
    NoUnits(PathBuf),

    #[error("unsupported unit file `{0}` (expected .json or .toml, or set [compute] command)")]
    UnsupportedExtension(PathBuf),

    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid data in `{path}`: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("compute command failed for `{unit}`: {detail}")]
    Command { unit: String, detail: String },

    #[error("computing `{0}` timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("computing `{0}` panicked")]
    Panicked(String),
}
