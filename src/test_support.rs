//! In-process HTTP stub for exercising the Telegram, download and Wit.ai clients.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request captured by the stub.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String, // Request line and headers
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Request line, e.g. `POST /speech?v=1 HTTP/1.1`.
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    }
}

/// Canned response returned for every request whose path starts with `prefix`.
#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub stall: bool, // Send headers and half the body, then hang
}

impl Route {
    pub fn json(prefix: &str, body: &str) -> Self {
        Self { prefix: prefix.to_string(), status: 200, content_type: "application/json", body: body.as_bytes().to_vec(), stall: false }
    }

    pub fn bytes(prefix: &str, body: Vec<u8>) -> Self {
        Self { prefix: prefix.to_string(), status: 200, content_type: "application/octet-stream", body, stall: false }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

/// A running stub server.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    /// Start serving `routes` on an ephemeral local port. Unmatched paths get a 404.
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let captured = captured.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, &routes, &captured).await;
                });
            }
        });

        Self { base_url, requests }
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_connection(mut stream: TcpStream, routes: &[Route], captured: &Mutex<Vec<CapturedRequest>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let request = CapturedRequest { head: head.clone(), body: Vec::new() };
    let content_length = request.header("content-length").and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = buf[header_end..].to_vec();

    let path = request.request_line().split_whitespace().nth(1).unwrap_or("/").to_string();
    captured.lock().unwrap().push(CapturedRequest { head, body });

    let (status, content_type, body, stall) = match routes.iter().find(|r| path.starts_with(&r.prefix)) {
        Some(route) => (route.status, route.content_type, route.body.clone(), route.stall),
        None => (404, "text/plain", b"not found".to_vec(), false),
    };

    let header = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;

    if stall {
        stream.write_all(&body[..body.len() / 2]).await?;
        stream.flush().await?;
        // Keep the connection open until the client gives up
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        return Ok(());
    }

    stream.write_all(&body).await?;
    stream.shutdown().await
}
