use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{IpAddr, Ipv4Addr, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;
use crate::config::test_parse_config;
use crate::core::{ShutdownTrigger, shutdown_channel};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    server: Arc<Server>,
    trigger: ShutdownTrigger,
    handle: JoinHandle<Result<()>>,
    temp: TempDir,
}

impl TestServer {
    /// Serve a directory with units `a` (older) and `b` (newer).
    fn start(extra_config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        write_unit(temp.path(), "a.json", r#"{"size": 1}"#, 0);
        write_unit(temp.path(), "b.json", r#"{"size": 2}"#, 1);
        write_unit(temp.path(), "broken.json", "{ nope", 0);

        let mut config = test_parse_config(&format!(
            "[watch]\npoll_interval_ms = 20\nheartbeat_ms = 100\nextensions = [\"json\"]\n{extra_config}"
        ));
        config.serve.interface = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.serve.port = 0;

        let (trigger, signal) = shutdown_channel();
        let ctx = ServeContext::new(temp.path(), Arc::new(config), signal).unwrap();
        let bound = bind_server(ctx).unwrap();
        let addr = bound.addr();
        let server = Arc::clone(&bound.server);
        let handle = thread::spawn(move || bound.run());

        Self {
            addr,
            server,
            trigger,
            handle,
            temp,
        }
    }

    fn dir(&self) -> &Path {
        self.temp.path()
    }

    fn stop(self) {
        self.trigger.trigger();
        self.server.unblock();
        self.handle.join().unwrap().unwrap();
    }
}

fn write_unit(dir: &Path, name: &str, body: &str, secs: u64) {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs);
    File::options().write(true).open(&path).unwrap().set_modified(mtime).unwrap();
}

fn connect(addr: SocketAddr, method: &str, path: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    write!(stream, "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
    stream
}

/// Send a request and return (status, headers, body).
fn fetch(addr: SocketAddr, method: &str, path: &str) -> (u16, String, String) {
    let mut raw = String::new();
    connect(addr, method, path).read_to_string(&mut raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    (status, head.to_string(), body.to_string())
}

/// Read SSE records until one of `event` arrives.
fn next_record(reader: &mut BufReader<TcpStream>, event: &str) -> (String, String) {
    let mut current = (String::new(), String::new());
    loop {
        let mut line = String::new();
        assert!(reader.read_line(&mut line).unwrap() > 0, "stream closed");
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            if current.0 == event {
                return current;
            }
            current = (String::new(), String::new());
        } else if let Some(value) = line.strip_prefix("event: ") {
            current.0 = value.to_string();
        } else if let Some(value) = line.strip_prefix("data: ") {
            current.1 = value.to_string();
        }
    }
}

#[test]
fn test_split_url() {
    assert_eq!(split_url("/"), ("/".into(), None));
    assert_eq!(split_url("/json?m=box"), ("/json".into(), Some("box".into())));
    assert_eq!(split_url("/html/?m=a%20b&x=1"), ("/html".into(), Some("a b".into())));
    assert_eq!(split_url("/?m="), ("/".into(), None));
    assert_eq!(split_url("/events?other=1"), ("/events".into(), None));
}

#[test]
fn test_json_status_follows_error_field() {
    let server = TestServer::start("[serve]\nwatch = false");

    let (status, head, body) = fetch(server.addr, "GET", "/json?m=a");
    assert_eq!(status, 200);
    assert!(head.contains("application/json"));
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"size": 1, "unit": "a"}));

    let (status, _, body) = fetch(server.addr, "GET", "/json?m=broken");
    assert_eq!(status, 400);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["unit"], json!("broken"));
    assert!(value["error"].is_string());

    let (status, _, _) = fetch(server.addr, "GET", "/json?m=missing");
    assert_eq!(status, 400);

    // no selector, no detected change yet: first unit
    let (_, _, body) = fetch(server.addr, "GET", "/json");
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["unit"], json!("a"));

    server.stop();
}

#[test]
fn test_pages_and_errors() {
    let server = TestServer::start("[serve]\nwatch = false\n[ui]\ntheme = \"dark\"");

    let (status, head, body) = fetch(server.addr, "GET", "/?m=b");
    assert_eq!(status, 200);
    assert!(head.contains("text/html"));
    assert!(body.contains("new EventSource(\"/events\")"));
    assert!(body.contains(r#"var selected = "b";"#));

    let (status, _, body) = fetch(server.addr, "GET", "/html?m=b");
    assert_eq!(status, 200);
    assert!(!body.contains("EventSource"));
    assert!(body.contains("&quot;size&quot;: 2"));

    let (status, _, _) = fetch(server.addr, "GET", "/nope");
    assert_eq!(status, 404);

    let (status, head, _) = fetch(server.addr, "POST", "/json");
    assert_eq!(status, 405);
    assert!(head.contains("Allow: GET, HEAD"));

    let (status, _, body) = fetch(server.addr, "HEAD", "/json");
    assert_eq!(status, 200);
    assert!(body.is_empty());

    server.stop();
}

#[test]
fn test_event_stream_headers_and_heartbeat() {
    let server = TestServer::start("[serve]\nwatch = false");

    let mut reader = BufReader::new(connect(server.addr, "GET", "/events"));
    let mut status_line = String::new();
    reader.read_line(&mut status_line).unwrap();
    assert!(status_line.starts_with("HTTP/1.1 200"));

    let mut headers = String::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line == "\r\n" {
            break;
        }
        headers.push_str(&line);
    }
    assert!(headers.contains("Content-Type: text/event-stream"));
    assert!(headers.contains("Cache-Control: no-store, must-revalidate"));
    assert!(headers.contains("Expires: 0"));

    let (_, first) = next_record(&mut reader, "keep_alive");
    let (_, second) = next_record(&mut reader, "keep_alive");
    assert_eq!(first, "0");
    assert_eq!(second, "1");

    drop(reader);
    server.stop();
}

#[test]
fn test_change_is_pushed_to_every_stream() {
    let server = TestServer::start("");

    let mut clients: Vec<_> = (0..2)
        .map(|_| BufReader::new(connect(server.addr, "GET", "/events")))
        .collect();
    for client in &mut clients {
        next_record(client, "keep_alive");
    }

    write_unit(server.dir(), "b.json", r#"{"size": 20}"#, 50);

    for client in &mut clients {
        let (_, data) = next_record(client, "file_update");
        let value: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(value, json!({"size": 20, "unit": "b"}));
    }

    // the detected change is now the default view
    let (_, _, body) = fetch(server.addr, "GET", "/json");
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["unit"], json!("b"));

    drop(clients);
    server.stop();
}
