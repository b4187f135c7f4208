//! Live preview server.
//!
//! | Route     | Response                                            |
//! |-----------|-----------------------------------------------------|
//! | `/`       | Page view with unit picker and live updates         |
//! | `/html`   | Standalone exported document                        |
//! | `/json`   | Derived data, 200 on success / 400 with `error`     |
//! | `/events` | Server-Sent Events (`file_update`, `keep_alive`)    |
//!
//! `?m=<unit>` selects a unit for that request on directory targets.

mod events;
mod lifecycle;
mod response;

use crate::{
    cli::common::ViewSource,
    config::AppConfig,
    core::{ShutdownSignal, register_server},
    log,
    stream::EventHub,
    unit::{ActiveUnit, UnitManager, UnitResolver, WatchTarget},
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tiny_http::{Method, Request, Server};

/// Size of the pool serving request/response endpoints.
const REQUEST_THREADS: usize = 4;

/// Shared state behind every endpoint.
pub struct ServeContext {
    pub resolver: Arc<dyn UnitResolver>,
    pub active: Arc<ActiveUnit>,
    pub hub: Arc<EventHub>,
    pub config: Arc<AppConfig>,
    pub shutdown: ShutdownSignal,
}

impl ServeContext {
    /// Build the context for a watch target.
    pub fn new(target: &Path, config: Arc<AppConfig>, shutdown: ShutdownSignal) -> Result<Self> {
        let target = WatchTarget::resolve(target)?;
        let resolver: Arc<dyn UnitResolver> = Arc::new(UnitManager::from_config(target, &config));
        Ok(Self::with_resolver(resolver, config, shutdown))
    }

    pub fn with_resolver(
        resolver: Arc<dyn UnitResolver>,
        config: Arc<AppConfig>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            resolver,
            active: Arc::new(ActiveUnit::new()),
            hub: Arc::new(EventHub::from_config(&config.watch)),
            config,
            shutdown,
        }
    }

    fn view(&self) -> ViewSource<'_> {
        ViewSource {
            resolver: &self.resolver,
            active: &self.active,
            config: &self.config,
        }
    }
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    ctx: Arc<ServeContext>,
}

/// Bind the HTTP server without starting the request loop
pub fn bind_server(ctx: ServeContext) -> Result<BoundServer> {
    let serve = &ctx.config.serve;
    let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port)?;
    let server = Arc::new(server);

    register_server(Arc::clone(&server));

    Ok(BoundServer {
        server,
        addr,
        ctx: Arc::new(ctx),
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the watcher and the request loop (blocking).
    pub fn run(self) -> Result<()> {
        log!("serve"; "http://{}", self.addr());
        let config = Arc::clone(&self.ctx.config);
        let watcher = lifecycle::spawn_watcher(&self.ctx, &config, self.ctx.shutdown.clone())?;
        run_request_loop(&self.server, &self.ctx)?;
        crate::debug!("serve"; "closing {} stream(s)", self.ctx.hub.subscriber_count());
        lifecycle::wait_for_shutdown(watcher);
        Ok(())
    }
}

fn run_request_loop(server: &Server, ctx: &Arc<ServeContext>) -> Result<()> {
    // Use thread pool to handle requests concurrently
    // Streams get their own threads, see `events`
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("request-{i}"))
        .build()
        .context("failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ServeContext) -> Result<()> {
    // Early exit if shutdown requested
    if crate::core::is_shutdown() || ctx.shutdown.is_triggered() {
        return response::respond_unavailable(request);
    }

    let is_head = match request.method() {
        Method::Get => false,
        Method::Head => true,
        _ => return response::respond_method_not_allowed(request),
    };

    let (path, selector) = split_url(request.url());
    crate::debug!("serve"; "{} {}", request.method(), request.url());

    match path.as_str() {
        "/" => {
            let (_, html) = ctx.view().render_viewer(selector.as_deref());
            response::respond_html(request, html)
        }
        "/html" => {
            let (_, html) = ctx.view().render_export(selector.as_deref());
            response::respond_html(request, html)
        }
        "/json" => {
            let data = ctx.view().snapshot(selector.as_deref());
            response::respond_json(request, &data)
        }
        "/events" if is_head => response::respond_stream_head(request),
        "/events" => events::start_stream(request, ctx),
        _ => response::respond_not_found(request),
    }
}

/// Split a request URL into its path and the `m` unit selector.
fn split_url(url: &str) -> (String, Option<String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let selector = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "m")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    let path = path.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), selector)
}

#[cfg(test)]
mod tests;
