//! Change broadcast to streaming clients.
//!
//! ```text
//! ChangeWatcher --publish--> EventHub --put--> EventQueue (per client)
//!                                                  |
//!                                        StreamBroadcaster --SSE--> client
//! ```
//!
//! # Modules
//!
//! - `message` - `BroadcastMessage` and Server-Sent-Events formatting
//! - `queue` - bounded drop-oldest `EventQueue`
//! - `hub` - fan-out of one producer to every subscribed queue
//! - `broadcaster` - per-client delivery loop with heartbeats

mod broadcaster;
mod hub;
mod message;
mod queue;


pub use broadcaster::{StreamBroadcaster, StreamEnd};
pub use hub::{EventHub, Subscription};
pub use message::{BroadcastMessage, EventKind};
pub use queue::{EventQueue, PutOutcome};
