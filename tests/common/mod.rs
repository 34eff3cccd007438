//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use http_orchestrator::request::RequestDescriptor;
use http_orchestrator::transport::{ResultEnvelope, Transport, TransportError};

pub type Reply = Result<ResultEnvelope, TransportError>;

/// Business envelope carrying a successful result.
pub fn success(result: Value) -> ResultEnvelope {
    ResultEnvelope::new(200, Some(json!({"code": 0, "result": result, "message": "ok"})))
}

/// In-memory transport driven by a closure: `(delay, reply)` per request.
///
/// `sent` counts dispatches that started; `completed` counts dispatches that
/// ran to the end of their delay (i.e. were not cancelled mid-flight).
pub struct ScriptedTransport {
    handler: Box<dyn Fn(&RequestDescriptor) -> (Duration, Reply) + Send + Sync>,
    pub seen: Mutex<Vec<RequestDescriptor>>,
    sent: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RequestDescriptor) -> (Duration, Reply) + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            seen: Mutex::new(Vec::new()),
            sent: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }

    /// Always succeed with `result` after `delay`.
    pub fn replying(delay: Duration, result: Value) -> Arc<Self> {
        Self::new(move |_| (delay, Ok(success(result.clone()))))
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResultEnvelope, TransportError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let (delay, reply) = (self.handler)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        reply
    }
}

/// A request as received by the mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Start a raw-TCP HTTP/1.1 backend on an ephemeral port.
///
/// Every request is parsed, forwarded on the returned channel, and answered
/// with `respond`'s `(status, delay, json body)`.
pub async fn start_recording_backend<F>(respond: F) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>)
where
    F: Fn(&CapturedRequest) -> (u16, Duration, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, respond.as_ref(), tx).await;
            });
        }
    });

    (addr, rx)
}

async fn serve_one<F>(
    mut socket: TcpStream,
    respond: &F,
    tx: mpsc::UnboundedSender<CapturedRequest>,
) -> std::io::Result<()>
where
    F: Fn(&CapturedRequest) -> (u16, Duration, String),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: BTreeMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let captured = CapturedRequest {
        method,
        target,
        headers,
        body,
    };
    let (status, delay, payload) = respond(&captured);
    let _ = tx.send(captured);

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
