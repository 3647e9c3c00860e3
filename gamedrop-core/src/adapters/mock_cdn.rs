//! Mock CDN server for testing
//!
//! Serves a catalog document at `/games.json` and segment files under
//! `/games/<file name>`, so the reqwest adapters can be exercised without
//! network access. Unknown segment names return 404.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::Value as JsonValue;

/// Mock CDN server for testing
pub struct MockCdnServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// What the mock serves
#[derive(Debug, Clone)]
pub struct MockCdnConfig {
    /// Body of `/games.json`
    pub catalog: JsonValue,
    /// (file name, bytes) pairs served under `/games/`
    pub segments: Vec<(String, Vec<u8>)>,
    /// Answer `/games.json` with HTTP 500
    pub fail_catalog: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockCdnConfig {
    fn default() -> Self {
        Self {
            catalog: JsonValue::Object(Default::default()),
            segments: Vec::new(),
            fail_catalog: false,
            delay_ms: 0,
        }
    }
}

impl MockCdnServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockCdnConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        let config = Arc::new(config);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = Arc::clone(&config);
                        thread::spawn(move || {
                            handle_connection(stream, &cfg);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn catalog_url(&self) -> String {
        format!("http://127.0.0.1:{}/games.json", self.port)
    }

    pub fn segment_base_url(&self) -> String {
        format!("http://127.0.0.1:{}/games", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockCdnServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockCdnConfig) {
    let _ = stream.set_nonblocking(false);
    let mut buffer = [0; 4096];

    let Ok(n) = stream.read(&mut buffer) else {
        return;
    };
    let request = String::from_utf8_lossy(&buffer[..n]);

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", "application/json", br#"{"error":"bad request"}"#);
        return;
    }
    if parts[0] != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", "application/json", br#"{"error":"method"}"#);
        return;
    }

    let path = parts[1].split('?').next().unwrap_or(parts[1]);

    if path == "/games.json" {
        if config.fail_catalog {
            send_response(&mut stream, 500, "Internal Server Error", "text/plain", b"boom");
        } else {
            let body = config.catalog.to_string();
            send_response(&mut stream, 200, "OK", "application/json", body.as_bytes());
        }
        return;
    }

    if let Some(name) = path.strip_prefix("/games/") {
        if let Some((_, bytes)) = config.segments.iter().find(|(file, _)| file == name) {
            send_response(&mut stream, 200, "OK", "application/octet-stream", bytes);
            return;
        }
    }

    send_response(&mut stream, 404, "Not Found", "text/plain", b"not found");
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, content_type: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        status_text,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockCdnServer::start(MockCdnConfig::default()).unwrap();
        assert!(server.port() > 0);
        assert!(server.catalog_url().ends_with("/games.json"));
    }
}
