//! Live-view HTTP surface.
//!
//! Serves the annotated feed to any number of concurrent viewers:
//! - `GET /` - minimal HTML page embedding the stream
//! - `GET /video_feed` - `multipart/x-mixed-replace` JPEG stream, one part
//!   per pipeline publish, until the client disconnects
//! - `GET /health` - liveness probe
//!
//! One accept loop thread, one thread per connection. Every viewer observes
//! the hub independently at whatever cadence the pipeline produces frames;
//! a viewer error tears down only that connection.

mod encoder;
mod hub;

pub use encoder::{EncoderConfig, StreamEncoder};
pub use hub::FrameHub;

use anyhow::{anyhow, Result};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_REQUEST_BYTES: usize = 8192;
const BOUNDARY: &str = "frame";
/// How long a viewer waits for a new frame before re-checking shutdown.
const VIEWER_POLL: Duration = Duration::from_millis(500);

const INDEX_HTML: &str = r#"<html>
<head>
    <title>Robotic Arm Monitor</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body { background-color: #111; color: white; text-align: center; font-family: sans-serif; margin: 0; padding: 0; }
        h1 { color: #0f0; margin-top: 20px; font-size: 1.5rem; }
        .video-container { width: 100%; display: flex; justify-content: center; }
        img { width: 100%; max-width: 800px; height: auto; border-bottom: 2px solid #555; }
        .status { margin-top: 15px; color: #888; font-size: 0.9rem; }
    </style>
</head>
<body>
    <h1>Robotic Arm Monitor</h1>
    <div class="video-container">
        <img src="/video_feed">
    </div>
    <p class="status">green = active, yellow = idle, red = stopped</p>
</body>
</html>
"#;

/// The viewer-facing HTTP server. Spawn it once; it runs until the shared
/// shutdown flag flips or the handle is stopped.
pub struct StreamServer {
    addr: String,
    hub: Arc<FrameHub>,
}

#[derive(Debug)]
pub struct StreamHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Stop the accept loop and join it. Viewer threads notice the flag at
    /// their next hub poll and drain on their own.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("stream server thread panicked"))?;
        }
        Ok(())
    }
}

impl StreamServer {
    pub fn new(addr: String, hub: Arc<FrameHub>) -> Self {
        Self { addr, hub }
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<StreamHandle> {
        let configured: SocketAddr = self
            .addr
            .parse()
            .map_err(|_| anyhow!("invalid listen address '{}'", self.addr))?;
        let listener = TcpListener::bind(configured)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let hub = self.hub;
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, hub, shutdown_thread) {
                log::error!("stream server stopped: {:#}", err);
            }
        });

        Ok(StreamHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(listener: TcpListener, hub: Arc<FrameHub>, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let hub = hub.clone();
                let shutdown = shutdown.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, hub, shutdown) {
                        // Disconnects land here; they are routine.
                        log::debug!("viewer {} closed: {:#}", peer, err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    hub: Arc<FrameHub>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    if request.method != "GET" {
        return write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#);
    }
    match request.path.as_str() {
        "/" => write_response(&mut stream, 200, "text/html; charset=utf-8", INDEX_HTML.as_bytes()),
        "/health" => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        "/video_feed" => stream_video(stream, hub, shutdown),
        _ => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
    }
}

/// Push the latest frame to one viewer as multipart parts, forever.
///
/// Ends with `Err` when the client goes away (broken pipe on write) or with
/// `Ok` on process shutdown.
fn stream_video(mut stream: TcpStream, hub: Arc<FrameHub>, shutdown: Arc<AtomicBool>) -> Result<()> {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={BOUNDARY}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(header.as_bytes())?;

    let mut last_seq = 0u64;
    if let Some((seq, jpeg)) = hub.latest() {
        write_part(&mut stream, &jpeg)?;
        last_seq = seq;
    }

    while !shutdown.load(Ordering::SeqCst) {
        if let Some((seq, jpeg)) = hub.wait_newer(last_seq, VIEWER_POLL) {
            write_part(&mut stream, &jpeg)?;
            last_seq = seq;
        }
    }
    Ok(())
}

fn write_part(stream: &mut TcpStream, jpeg: &[u8]) -> Result<()> {
    let head = format!(
        "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(jpeg)?;
    stream.write_all(b"\r\n")?;
    stream.flush()?;
    Ok(())
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let request_line = text
        .split("\r\n")
        .next()
        .ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}
