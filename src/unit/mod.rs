//! Source units and their derived data.
//!
//! A watch target is either a single file (one unit) or a directory whose
//! direct children are the candidate units.
//!
//! # Module Structure
//!
//! - `active` - "last detected change" shared between watcher and read paths
//! - `data` - `DerivedData` snapshots (success or error-flagged)
//! - `error` - `UnitError`
//! - `manager` - filesystem `UnitResolver` (mtime polling + compute)
//! - `resolver` - the `UnitResolver` capability and the hardened `snapshot`

mod active;
mod data;
mod error;
mod manager;
mod resolver;


pub use active::ActiveUnit;
pub use data::DerivedData;
pub use error::UnitError;
pub use manager::UnitManager;
pub use resolver::{UnitResolver, snapshot, view_snapshot, view_unit};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::utils::path::normalize_path;

// =============================================================================
// WatchTarget
// =============================================================================

/// The file or directory being watched. Fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
    is_dir: bool,
}

impl WatchTarget {
    /// Resolve a user-supplied path into an absolute watch target.
    pub fn resolve(path: &Path) -> Result<Self, UnitError> {
        let path = normalize_path(path);
        let meta = fs::metadata(&path).map_err(|e| UnitError::NotFound(path.clone(), e))?;
        Ok(Self {
            is_dir: meta.is_dir(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Directory containing the units (the target itself, or the file's parent).
    pub fn dir(&self) -> &Path {
        if self.is_dir {
            &self.path
        } else {
            self.path.parent().unwrap_or(&self.path)
        }
    }
}

// =============================================================================
// UnitName
// =============================================================================

/// Short name of a unit: file name without directory and extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `/models/box.json` -> `box`
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
