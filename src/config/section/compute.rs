//! `[compute]` section configuration.
//!
//! By default unit files are parsed directly (`.json`, `.toml`). A compute
//! command replaces that: it runs once per snapshot and must print a JSON
//! object on stdout.
//!
//! # Example
//!
//! ```toml
//! [compute]
//! command = ["python3", "derive.py", "$UNIT_PATH"]
//! ```
//!
//! Variables substituted in arguments (and exported as `LIVEWATCH_*`):
//!
//! | Variable       | Value                               |
//! |----------------|-------------------------------------|
//! | `$UNIT_PATH`   | Absolute path of the unit file      |
//! | `$UNIT_NAME`   | Unit name (file stem)               |
//! | `$TARGET_DIR`  | Directory holding the units         |

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// External compute command settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// Command and arguments. Empty means built-in parsing.
    pub command: Vec<String>,
}

impl ComputeConfig {
    pub const COMMAND: FieldPath = FieldPath::new("compute.command");

    pub fn is_external(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let Some(cmd) = self.command.first() else {
            return;
        };

        if cmd.trim().is_empty() {
            diag.error(Self::COMMAND, "program name is empty");
            return;
        }

        if which::which(cmd).is_err() {
            diag.error_with_hint(
                Self::COMMAND,
                format!("`{cmd}` not found"),
                format!("install the command or update {}", Self::COMMAND),
            );
        }
    }
}
