//! MIME type constants for server responses.

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const EVENT_STREAM: &str = "text/event-stream";
}
