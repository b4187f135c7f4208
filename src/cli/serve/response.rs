//! HTTP response handlers.

use crate::unit::DerivedData;
use crate::utils::mime::types::{HTML, JSON, PLAIN};
use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

/// Respond with a rendered page.
pub fn respond_html(request: Request, body: String) -> Result<()> {
    send_body(request, 200, HTML, body.into_bytes())
}

/// Respond with derived data: 200 on success, 400 when it carries an `error`.
pub fn respond_json(request: Request, data: &DerivedData) -> Result<()> {
    send_body(request, data.status_code(), JSON, data.to_json().into_bytes())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", PLAIN))
        .with_header(make_header("Allow", "GET, HEAD"));
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// HEAD on the stream endpoint: headers only, no stream.
pub fn respond_stream_head(request: Request) -> Result<()> {
    let response = Response::empty(StatusCode(200))
        .with_header(make_header("Content-Type", crate::utils::mime::types::EVENT_STREAM))
        .with_header(make_header("Cache-Control", "no-store, must-revalidate"))
        .with_header(make_header("Expires", "0"));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-store"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).expect("static header is valid ASCII")
}
