//! Page rendering shared by `serve` and `export`.

use std::sync::Arc;

use serde_json::Value;

use crate::config::AppConfig;
use crate::embed::serve::{EXPORT_HTML, ExportVars, VIEWER_HTML, ViewerVars};
use crate::unit::{ActiveUnit, DerivedData, UnitResolver, WatchTarget, view_snapshot};

/// Read-path state: what to compute and which unit was seen changing last.
pub struct ViewSource<'a> {
    pub resolver: &'a Arc<dyn UnitResolver>,
    pub active: &'a ActiveUnit,
    pub config: &'a AppConfig,
}

impl ViewSource<'_> {
    /// Snapshot of the unit a request should see.
    ///
    /// The selector only applies to directory targets.
    pub fn snapshot(&self, selector: Option<&str>) -> DerivedData {
        let selector = selector.filter(|_| self.resolver.target().is_dir());
        view_snapshot(
            self.resolver,
            self.active,
            selector,
            self.config.watch.compute_timeout(),
        )
    }

    /// Live page view.
    pub fn render_viewer(&self, selector: Option<&str>) -> (DerivedData, String) {
        let target = self.resolver.target();
        let selector = selector.filter(|s| !s.is_empty() && target.is_dir());
        let data = self.snapshot(selector);

        let units: Vec<_> = self.resolver.units().iter().map(|u| u.to_string()).collect();
        let units = Value::from(units).to_string();
        let selected = selector.map_or(Value::Null, Value::from).to_string();

        let html = VIEWER_HTML.render(&ViewerVars {
            title: &title_for(target),
            units: &units,
            selected: &selected,
            options: &self.config.ui_json(),
            data: &data.to_json(),
            heartbeat_ms: self.config.watch.heartbeat_ms,
        });
        (data, html)
    }

    /// Standalone exported document.
    pub fn render_export(&self, selector: Option<&str>) -> (DerivedData, String) {
        let data = self.snapshot(selector);
        let title = match data.unit() {
            Some(unit) => unit.to_string(),
            None => title_for(self.resolver.target()),
        };
        let pretty = serde_json::to_string_pretty(data.fields()).unwrap_or_else(|_| data.to_json());

        let html = EXPORT_HTML.render(&ExportVars {
            title: &title,
            options: &self.config.ui_json(),
            data: &data.to_json(),
            pretty: &pretty,
            version: env!("CARGO_PKG_VERSION"),
        });
        (data, html)
    }
}

/// Display name of the watch target: its final path component.
pub fn title_for(target: &WatchTarget) -> String {
    target
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.path().display().to_string())
}
