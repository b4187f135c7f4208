//! Per-client delivery loop.
//!
//! Each iteration waits up to one heartbeat interval for a queued message.
//! If one arrives it is written as an SSE record, otherwise a `keep_alive`
//! record with an increasing counter goes out instead. There is no explicit
//! cancellation from the client side: a failed write means the far end is
//! gone, and the loop ends.

use std::io::{self, Write};
use std::time::Duration;

use super::{BroadcastMessage, EventKind, Subscription};
use crate::core::ShutdownSignal;

/// Why a broadcaster stopped.
#[derive(Debug)]
pub enum StreamEnd {
    /// Writing to the client failed (connection closed)
    Disconnected(io::Error),
    /// Process shutdown was requested
    Shutdown,
}

pub struct StreamBroadcaster<W: Write> {
    subscription: Subscription,
    writer: W,
    heartbeat: Duration,
    shutdown: ShutdownSignal,
    /// Next heartbeat counter value
    counter: u64,
}

impl<W: Write> StreamBroadcaster<W> {
    pub fn new(
        subscription: Subscription,
        writer: W,
        heartbeat: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            subscription,
            writer,
            heartbeat,
            shutdown,
            counter: 0,
        }
    }

    /// Deliver the next queued message, or a heartbeat if none arrives in time.
    pub fn step(&mut self) -> io::Result<EventKind> {
        let msg = match self.subscription.get(self.heartbeat) {
            Some(msg) => msg,
            None => {
                let heartbeat = BroadcastMessage::heartbeat(self.counter);
                self.counter += 1;
                heartbeat
            }
        };
        msg.write_to(&mut self.writer)?;
        Ok(msg.kind())
    }

    /// Loop until the client goes away or the process shuts down.
    ///
    /// Consumes the broadcaster: the subscription and the writer are released
    /// when this returns.
    pub fn run(mut self) -> StreamEnd {
        let id = self.subscription.id();
        loop {
            if self.shutdown.is_triggered() {
                crate::debug!("stream"; "client {} closed by shutdown", id);
                return StreamEnd::Shutdown;
            }
            match self.step() {
                Ok(EventKind::FileUpdate) => {
                    crate::debug!("stream"; "sent update to client {}", id);
                }
                Ok(EventKind::KeepAlive) => {}
                Err(e) => {
                    crate::debug!(
                        "stream";
                        "client {} disconnected with {} pending",
                        id,
                        self.subscription.pending()
                    );
                    return StreamEnd::Disconnected(e);
                }
            }
        }
    }
}
