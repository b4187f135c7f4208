//! Command-line interface module.

mod args;
pub mod common;
pub mod export;
pub mod serve;

pub use args::{Cli, Commands, ViewArgs};
