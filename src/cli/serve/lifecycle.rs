//! Server lifecycle management.

use crate::{config::AppConfig, core::ShutdownSignal, log, watch::ChangeWatcher};
use anyhow::Result;
use std::{
    net::SocketAddr,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;

use super::ServeContext;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(
    interface: std::net::IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 asks the OS for a free port: report the real one
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some((port, e)),
        }
    }

    match last_error {
        Some((port, e)) => Err(anyhow::anyhow!(
            "Failed to bind after {} attempts (ports {}-{}): {}",
            MAX_PORT_RETRIES,
            base_port,
            port,
            e
        )),
        None => Err(anyhow::anyhow!("no port available from {}", base_port)),
    }
}

/// Start the change watcher on its own thread, unless watching is disabled.
pub fn spawn_watcher(
    ctx: &ServeContext,
    config: &AppConfig,
    shutdown: ShutdownSignal,
) -> Result<Option<JoinHandle<()>>> {
    if !config.serve.watch {
        log!("watch"; "disabled, streams will only carry heartbeats");
        return Ok(None);
    }

    let watcher = ChangeWatcher::from_config(
        ctx.resolver.clone(),
        ctx.active.clone(),
        ctx.hub.clone(),
        config,
    );
    log!("watch"; "{}", ctx.resolver.target().path().display());
    if config.compute.is_external() {
        log!("watch"; "compute: {}", config.compute.command.join(" "));
    }
    Ok(Some(watcher.spawn(shutdown)?))
}

/// Wait for the watcher to stop (max 2 seconds).
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
