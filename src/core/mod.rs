//! Core types - process state shared across the codebase.

mod state;

pub use state::{
    ShutdownSignal, ShutdownTrigger, is_shutdown, register_server, setup_shutdown_handler,
    shutdown_channel, shutdown_signal,
};
