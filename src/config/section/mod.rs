//! Configuration section definitions.
//!
//! Each module corresponds to a section in `livewatch.toml`:
//!
//! | Module    | TOML Section | Purpose                                |
//! |-----------|--------------|----------------------------------------|
//! | `serve`   | `[serve]`    | Preview server address and watch mode  |
//! | `watch`   | `[watch]`    | Polling, queueing, heartbeat timing    |
//! | `compute` | `[compute]`  | External compute command               |
//!
//! `[ui]` has no schema: it is passed through to the page view as JSON.

mod compute;
mod serve;
mod watch;

pub use compute::ComputeConfig;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
