//! Process lifecycle state for serve mode.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)
//! - `ShutdownSignal`: cancellation token handed to background loops
//!
//! The token is a crossbeam channel nobody ever sends on. Dropping the
//! `ShutdownTrigger` (the only sender) disconnects every cloned receiver
//! at once, which wakes blocked waiters immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Process-wide token: the trigger is taken (dropped) by the Ctrl+C handler.
static PROCESS_SHUTDOWN: LazyLock<(Mutex<Option<ShutdownTrigger>>, ShutdownSignal)> =
    LazyLock::new(|| {
        let (trigger, signal) = shutdown_channel();
        (Mutex::new(Some(trigger)), signal)
    });

// =============================================================================
// Cancellation token
// =============================================================================

/// Receiving side of a shutdown token. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

/// Sending side of a shutdown token. Dropping it triggers shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    _tx: Sender<()>,
}

/// Create a connected trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = channel::bounded(0);
    (ShutdownTrigger { _tx: tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    /// Trigger shutdown for every signal cloned from this pair.
    pub fn trigger(self) {
        drop(self);
    }
}

impl ShutdownSignal {
    /// A signal that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        Self {
            rx: channel::never(),
        }
    }

    /// Check without blocking.
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `timeout` or until shutdown, whichever comes first.
    ///
    /// Returns `true` if shutdown was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Clone of the process-wide shutdown signal (fired by Ctrl+C).
pub fn shutdown_signal() -> ShutdownSignal {
    PROCESS_SHUTDOWN.1.clone()
}

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_server()`: exits immediately, nothing to drain
/// - After `register_server()`: fires the shutdown token and unblocks the server
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        if let Some(trigger) = PROCESS_SHUTDOWN.0.lock().take() {
            trigger.trigger();
        }

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_signal_not_triggered_while_trigger_alive() {
        let (_trigger, signal) = shutdown_channel();
        assert!(!signal.is_triggered());
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_trigger_fires_all_clones() {
        let (trigger, signal) = shutdown_channel();
        let clone = signal.clone();
        trigger.trigger();
        assert!(signal.is_triggered());
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_trigger_wakes_waiter_early() {
        let (trigger, signal) = shutdown_channel();
        let waiter = std::thread::spawn(move || {
            let start = Instant::now();
            let fired = signal.wait_timeout(Duration::from_secs(30));
            (fired, start.elapsed())
        });
        std::thread::sleep(Duration::from_millis(20));
        trigger.trigger();

        let (fired, elapsed) = waiter.join().unwrap();
        assert!(fired);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_never_signal() {
        let signal = ShutdownSignal::never();
        assert!(!signal.is_triggered());
        assert!(!signal.wait_timeout(Duration::from_millis(1)));
    }
}
