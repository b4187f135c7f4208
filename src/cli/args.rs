//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::ConfigError;

/// Live preview server for data files
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path [default: livewatch.toml, searched upward and optional]
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve a live view of the target, pushing updates on change
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        view: ViewArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Watch the target for changes
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },

    /// Write a standalone HTML document of one unit's data
    #[command(visible_alias = "e")]
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Unit to export (directory targets; default: first unit)
        #[arg(short = 'm', long = "unit")]
        unit: Option<String>,

        /// Write to file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

/// Arguments shared by commands that render a view.
#[derive(clap::Args, Debug, Clone)]
pub struct ViewArgs {
    /// File or directory to watch
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    pub target: PathBuf,

    /// Display option passed to the page view (repeatable).
    /// Values are parsed as JSON when possible, otherwise kept as strings.
    #[arg(long = "ui", value_name = "KEY=VALUE", value_parser = parse_ui_option)]
    pub ui: Vec<(String, Value)>,
}

/// `scale=2` -> `("scale", 2)`, `theme=dark` -> `("theme", "dark")`
fn parse_ui_option(s: &str) -> Result<(String, Value), ConfigError> {
    let (key, raw) = s
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::UiOption(s.to_string()))?;

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ui_option_values() {
        assert_eq!(parse_ui_option("scale=2").unwrap(), ("scale".into(), json!(2)));
        assert_eq!(parse_ui_option("grid=false").unwrap(), ("grid".into(), json!(false)));
        assert_eq!(parse_ui_option("theme=dark").unwrap(), ("theme".into(), json!("dark")));
        assert_eq!(parse_ui_option("size=[1,2]").unwrap(), ("size".into(), json!([1, 2])));
        assert_eq!(parse_ui_option("title=").unwrap(), ("title".into(), json!("")));
        assert_eq!(parse_ui_option("expr=a=b").unwrap(), ("expr".into(), json!("a=b")));
    }

    #[test]
    fn test_parse_ui_option_rejects_missing_key() {
        assert!(parse_ui_option("noequals").is_err());
        assert!(parse_ui_option("=value").is_err());
    }

    #[test]
    fn test_serve_args() {
        let cli = Cli::try_parse_from([
            "livewatch", "serve", "models", "-i", "0.0.0.0", "-p", "8080", "-w", "false", "-V",
        ])
        .unwrap();

        let Commands::Serve {
            view,
            interface,
            port,
            watch,
            verbose,
        } = &cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(view.target, PathBuf::from("models"));
        assert_eq!(interface.unwrap().to_string(), "0.0.0.0");
        assert_eq!(*port, Some(8080));
        assert_eq!(*watch, Some(false));
        assert!(*verbose);
    }

    #[test]
    fn test_bare_watch_flag_means_true() {
        let cli = Cli::try_parse_from(["livewatch", "serve", "models", "-w"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { watch: Some(true), .. }));
    }

    #[test]
    fn test_export_args() {
        let cli = Cli::try_parse_from([
            "livewatch", "-C", "alt.toml", "export", "models", "-m", "box", "-o", "box.html",
            "--ui", "scale=2",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        let Commands::Export { view, unit, output } = &cli.command else {
            panic!("expected export");
        };
        assert_eq!(unit.as_deref(), Some("box"));
        assert_eq!(output.as_deref(), Some(std::path::Path::new("box.html")));
        assert_eq!(view.ui, [("scale".to_string(), json!(2))]);
        assert_eq!(view.target, PathBuf::from("models"));
    }

    #[test]
    fn test_target_required() {
        assert!(Cli::try_parse_from(["livewatch", "serve"]).is_err());
    }
}
