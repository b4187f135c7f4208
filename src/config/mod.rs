//! Configuration management for `livewatch.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── compute    # [compute]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # AppConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[serve]`   | Preview server (interface, port, watch)          |
//! | `[watch]`   | Poll interval, queue size, heartbeat, timeouts   |
//! | `[compute]` | External command producing a unit's data         |
//! | `[ui]`      | Free-form display options for the page view      |
//!
//! The file is optional. Without it every section takes its defaults.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{ComputeConfig, ServeConfig, WatchConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands, ViewArgs};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Config file looked up when no `-C` is given.
const CONFIG_FILE: &str = "livewatch.toml";

/// Root configuration structure representing livewatch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Absolute path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Change detection and streaming settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// External compute command
    #[serde(default)]
    pub compute: ComputeConfig,

    /// Display options passed through to the page view
    #[serde(default)]
    pub ui: Map<String, Value>,
}

impl AppConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// An explicit `-C` path must exist. Otherwise `livewatch.toml` is
    /// searched upward from cwd and defaults apply when there is none.
    /// Command-line overrides are applied, then the result is validated.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => {
                let cwd =
                    std::env::current_dir().context("Failed to get current working directory")?;
                find_config_file(Path::new(CONFIG_FILE), &cwd)
            }
        };

        let mut config = match path {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = Some(crate::utils::path::normalize_path(&path));
                if let Some(path) = &config.config_path {
                    crate::debug!("config"; "loaded {}", path.display());
                }
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };

        config.apply_command_options(&cli.command);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Serve {
                view,
                interface,
                port,
                watch,
                verbose,
            } => {
                crate::logger::set_verbose(*verbose);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
                self.apply_view_args(view);
            }
            Commands::Export { view, .. } => self.apply_view_args(view),
        }
    }

    /// `--ui KEY=VALUE` entries override `[ui]` keys.
    fn apply_view_args(&mut self, view: &ViewArgs) {
        for (key, value) in &view.ui {
            self.ui.insert(key.clone(), value.clone());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate all sections, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.watch.validate(&mut diag);
        self.compute.validate(&mut diag);

        diag.into_result().map_err(ConfigError::Validation)
    }

    /// `[ui]` options as one JSON object for the page view.
    pub fn ui_json(&self) -> String {
        serde_json::to_string(&self.ui).unwrap_or_else(|_| String::from("{}"))
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AppConfig {
    let (parsed, ignored) = AppConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
