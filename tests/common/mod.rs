//! Loopback stand-in for an Ollama server
//!
//! Serves canned bodies per route. Bodies are written part by part with a
//! short pause in between so streamed lines can be split across reads.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned response for one method and path
#[derive(Debug, Clone)]
pub struct Route {
    method: &'static str,
    path: &'static str,
    status: u16,
    parts: Vec<String>,
    /// Pause before the response head
    delay: Duration,
    /// Pause after the part at this index
    stall: Option<(usize, Duration)>,
}

impl Route {
    pub fn get(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            method: "GET",
            path,
            status: 200,
            parts: vec![body.into()],
            delay: Duration::ZERO,
            stall: None,
        }
    }

    pub fn post(path: &'static str, parts: &[&str]) -> Self {
        Self {
            method: "POST",
            path,
            status: 200,
            parts: parts.iter().map(|p| p.to_string()).collect(),
            delay: Duration::ZERO,
            stall: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_stall(mut self, after_part: usize, pause: Duration) -> Self {
        self.stall = Some((after_part, pause));
        self
    }
}

/// One request as received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Request line and headers, lowercased
    pub head: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct FakeOllama {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeOllama {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self, path: &str) -> Recorded {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no request to {}", path))
    }
}

/// Start a server on an ephemeral port
pub async fn spawn(routes: Vec<Route>) -> FakeOllama {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, routes.clone(), recorded.clone()));
        }
    });

    FakeOllama { url, requests }
}

async fn serve(mut socket: TcpStream, routes: Arc<Vec<Route>>, requests: Arc<Mutex<Vec<Recorded>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim() == "content-length")
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).into_owned();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_uppercase();
    let path = request_line.next().unwrap_or_default().to_string();

    requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        head: head.clone(),
        body,
    });

    let route = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .cloned()
        .unwrap_or_else(|| {
            Route::post("", &[r#"{"error":"not found"}"#]).with_status(404)
        });
    let status = route.status;

    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }

    let reason = if status == 200 { "OK" } else { "Error" };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
        status, reason
    );
    if socket.write_all(header.as_bytes()).await.is_err() {
        return;
    }

    for (index, part) in route.parts.iter().enumerate() {
        if socket.write_all(part.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
        let pause = match route.stall {
            Some((after, pause)) if after == index => pause,
            _ => Duration::from_millis(20),
        };
        tokio::time::sleep(pause).await;
    }
    let _ = socket.shutdown().await;
}
