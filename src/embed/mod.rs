//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Page view and export documents (viewer.html, export.html)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{VIEWER_HTML, ViewerVars};
//!
//! let html = VIEWER_HTML.render(&ViewerVars { title: "box", .. });
//! ```

mod template;

pub use template::{Template, TemplateVars};

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Make a JSON text safe to inline inside a `<script>` element.
///
/// `</script>` in a string value would otherwise close the element early.
pub fn script_json(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "\\u003c!--")
}

pub mod serve {
    use super::{Template, TemplateVars, escape_html, script_json};

    /// Variables for viewer.html.
    pub struct ViewerVars<'a> {
        /// Page title (target name)
        pub title: &'a str,
        /// JSON array of available unit names
        pub units: &'a str,
        /// JSON string of the unit picked via `?m=`, or `null`
        pub selected: &'a str,
        /// JSON object of `[ui]` options
        pub options: &'a str,
        /// Derived data JSON
        pub data: &'a str,
        /// Heartbeat interval, used by the client to detect a dead stream
        pub heartbeat_ms: u64,
    }

    impl TemplateVars for ViewerVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__TITLE__", &escape_html(self.title))
                .replace("__UNITS__", &script_json(self.units))
                .replace("__SELECTED__", &script_json(self.selected))
                .replace("__OPTIONS__", &script_json(self.options))
                .replace("__HEARTBEAT_MS__", &self.heartbeat_ms.to_string())
                .replace("__DATA__", &script_json(self.data))
        }
    }

    /// Live page view with unit picker and `EventSource` updates.
    pub const VIEWER_HTML: Template<ViewerVars<'static>> =
        Template::new(include_str!("serve/viewer.html"));

    /// Variables for export.html.
    pub struct ExportVars<'a> {
        pub title: &'a str,
        pub options: &'a str,
        /// Derived data JSON
        pub data: &'a str,
        /// Pretty-printed data for the static body
        pub pretty: &'a str,
        pub version: &'a str,
    }

    impl TemplateVars for ExportVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__TITLE__", &escape_html(self.title))
                .replace("__OPTIONS__", &script_json(self.options))
                .replace("__VERSION__", self.version)
                .replace("__PRETTY__", &escape_html(self.pretty))
                .replace("__DATA__", &script_json(self.data))
        }
    }

    /// Standalone document with the data inlined and no server connection.
    pub const EXPORT_HTML: Template<ExportVars<'static>> =
        Template::new(include_str!("serve/export.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::*;
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_script_json_cannot_close_script() {
        let json = r#"{"note":"</script><script>alert(1)</script>"}"#;
        let safe = script_json(json);
        assert!(!safe.contains("</script"));
        // still the same JSON value once parsed
        let a: serde_json::Value = serde_json::from_str(json).unwrap();
        let b: serde_json::Value = serde_json::from_str(&safe).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_viewer_renders_all_placeholders() {
        let html = VIEWER_HTML.render(&ViewerVars {
            title: "models",
            units: r#"["a","b"]"#,
            selected: "null",
            options: r#"{"theme":"dark"}"#,
            data: r#"{"unit":"a"}"#,
            heartbeat_ms: 1000,
        });
        assert!(!html.contains("__"));
        assert!(html.contains(r#"["a","b"]"#));
        assert!(html.contains(r#"{"theme":"dark"}"#));
        assert!(html.contains("new EventSource"));
    }

    #[test]
    fn test_export_has_no_stream() {
        let html = EXPORT_HTML.render(&ExportVars {
            title: "<box>",
            options: "{}",
            data: r#"{"unit":"box"}"#,
            pretty: "{\n  \"unit\": \"box\"\n}",
            version: "0.0.0",
        });
        assert!(!html.contains("__"));
        assert!(!html.contains("EventSource"));
        assert!(html.contains("&lt;box&gt;"));
        assert!(html.contains("&quot;unit&quot;"));
    }
}
