//! `GET /events`: Server-Sent Events stream.
//!
//! The request is taken over as a raw writer and handed to a
//! `StreamBroadcaster` on a dedicated thread, so long-lived streams never
//! occupy the request pool.

use std::io::Write;
use std::thread;

use anyhow::{Context, Result};
use tiny_http::Request;

use super::ServeContext;
use crate::stream::{StreamBroadcaster, StreamEnd};

/// Status line and headers written ahead of the first record.
const STREAM_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-store, must-revalidate\r\n\
Expires: 0\r\n\
Connection: close\r\n\
\r\n";

/// Subscribe the client and start its delivery thread.
pub fn start_stream(request: Request, ctx: &ServeContext) -> Result<()> {
    // Subscribe before the headers go out, so no update published in between is lost
    let subscription = ctx.hub.subscribe();
    let id = subscription.id();
    let heartbeat = ctx.config.watch.heartbeat();
    let shutdown = ctx.shutdown.clone();
    let peer = request.remote_addr().copied();

    thread::Builder::new()
        .name(format!("stream-{id}"))
        .spawn(move || {
            let mut writer = request.into_writer();
            if let Err(e) = writer.write_all(STREAM_HEAD).and_then(|()| writer.flush()) {
                crate::debug!("stream"; "client {} gone before headers: {}", id, e);
                return;
            }
            crate::debug!("stream"; "client {} connected from {:?}", id, peer);

            match StreamBroadcaster::new(subscription, writer, heartbeat, shutdown).run() {
                StreamEnd::Disconnected(e) => crate::debug!("stream"; "client {} closed: {}", id, e),
                StreamEnd::Shutdown => {}
            }
        })
        .context("failed to spawn stream thread")?;

    Ok(())
}
