//! Shared mock backends and proxy harness for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use shadowtee::config::model::Config;
use shadowtee::proxy::sampling::SeededRandom;
use shadowtee::proxy::MirrorEngine;
use shadowtee::server::{self, AppState};

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What a recording backend answers with.
#[derive(Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

impl Reply {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body,
        }
    }
}

/// Backend that records every request it receives and answers with `reply`.
pub async fn start_recording_backend(reply: Reply) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let router = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let tx = tx.clone();
            let reply = reply.clone();
            async move {
                let _ = tx.send(Captured {
                    method,
                    uri,
                    headers,
                    body,
                });
                let mut response = (reply.status, reply.body).into_response();
                for (name, value) in reply.headers {
                    response
                        .headers_mut()
                        .append(name, value.parse().unwrap());
                }
                response
            }
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, rx)
}

/// Backend that accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Running proxy; dropping it shuts the server down.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub async fn start_proxy(config: Config) -> TestProxy {
    let engine = MirrorEngine::from_config(&config, Arc::new(SeededRandom::with_seed(7))).unwrap();
    let state = Arc::new(AppState::new(engine));
    let router = server::build_router(state.clone(), 1_048_576);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        server::serve_plain(listener, router, async move {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    TestProxy {
        addr,
        state,
        _shutdown: shutdown_tx,
    }
}

/// Wait for the next captured request, failing after `wait`.
pub async fn next_request(
    rx: &mut mpsc::UnboundedReceiver<Captured>,
    wait: Duration,
) -> Option<Captured> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

pub fn http(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

/// POST `chunks` chunks of `chunk_size` bytes with chunked framing (no
/// `Content-Length`) and return the response status code.
///
/// The body is written from a separate task so the status line can be read
/// even when the server answers before the upload finishes.
pub async fn post_chunked(addr: SocketAddr, chunks: usize, chunk_size: usize) -> u16 {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();

    let upload = tokio::spawn(async move {
        let head = format!(
            "POST /upload HTTP/1.1\r\nHost: {addr}\r\nTransfer-Encoding: chunked\r\n\r\n"
        );
        writer.write_all(head.as_bytes()).await?;
        let chunk = vec![b'x'; chunk_size];
        for _ in 0..chunks {
            writer
                .write_all(format!("{chunk_size:x}\r\n").as_bytes())
                .await?;
            writer.write_all(&chunk).await?;
            writer.write_all(b"\r\n").await?;
        }
        writer.write_all(b"0\r\n\r\n").await?;
        Ok::<_, std::io::Error>(writer)
    });

    let mut response = Vec::new();
    let mut buf = [0u8; 1024];
    while !response.windows(2).any(|w| w == b"\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(5), reader.read(&mut buf))
            .await
            .expect("no response from proxy")
            .unwrap();
        assert!(n > 0, "connection closed before a status line");
        response.extend_from_slice(&buf[..n]);
    }
    upload.abort();

    let status_line = String::from_utf8_lossy(&response);
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("malformed status line")
}
