//! `livewatch export`: render one unit as a standalone HTML document.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use super::common::ViewSource;
use crate::config::AppConfig;
use crate::log;
use crate::unit::{ActiveUnit, UnitManager, UnitResolver, WatchTarget};

/// Render the export document for `target` and write it to `output` or stdout.
///
/// The document is written even for a failed unit, so the error is visible
/// in it, but the command then exits with an error.
pub fn export_unit(
    target: &Path,
    unit: Option<&str>,
    output: Option<&Path>,
    config: &AppConfig,
) -> Result<()> {
    let target = WatchTarget::resolve(target)?;
    let resolver: Arc<dyn UnitResolver> = Arc::new(UnitManager::from_config(target, config));
    let active = ActiveUnit::new();

    let view = ViewSource {
        resolver: &resolver,
        active: &active,
        config,
    };
    let (data, html) = view.render_export(unit);

    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("Failed to write {}", path.display()))?;
            log!("export"; "{}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
        }
    }

    if let Some(error) = data.error() {
        bail!("{}", error);
    }
    Ok(())
}
