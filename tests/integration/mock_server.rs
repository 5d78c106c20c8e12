//! Mock HTTP servers for integration tests.

use chat_stream_client::store::{LocalStore, MemoryStore};
use chat_stream_client::{ChatClient, TtlCache};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

static TRACING: Once = Once::new();

/// Log to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Test fixture that manages a mockito server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        init_tracing();
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Client pointed at the mock server with its own cache and an in-memory store.
    pub fn client(&self) -> ChatClient {
        self.client_with_store(Arc::new(MemoryStore::new()))
    }

    pub fn client_with_store(&self, store: Arc<dyn LocalStore>) -> ChatClient {
        test_client(&self.base_url, store)
    }

    /// Mock a JSON response for `method` on any request whose path starts with
    /// `path`, expected to be hit exactly `hits` times.
    pub async fn mock_json(
        &self,
        method: &str,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, Matcher::Regex(format!("^{}", regex_escape(path))))
            .expect(hits)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Mock a plain-text streamed reply to `POST path`.
    pub async fn mock_text_stream(&self, path: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body)
            .create_async()
            .await
    }
}

fn regex_escape(path: &str) -> String {
    path.chars()
        .flat_map(|c| {
            let escape = matches!(c, '.' | '?' | '+' | '*' | '(' | ')' | '[' | ']');
            escape.then_some('\\').into_iter().chain(std::iter::once(c))
        })
        .collect()
}

pub fn test_client(base_url: &str, store: Arc<dyn LocalStore>) -> ChatClient {
    init_tracing();
    ChatClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(5))
        .store(store)
        .cache(Arc::new(TtlCache::new()))
        .build()
        .expect("client should build")
}

/// Address with nothing listening on it.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Accepts connections but never answers.
pub async fn silent_server() -> SocketAddr {
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

/// Serves one chunked `200 OK` reply, writing `parts` as separate chunks
/// with `gap` between them.
pub async fn chunked_server(parts: Vec<Vec<u8>>, gap: Duration) -> SocketAddr {
    serve_chunked(parts, gap, true).await
}

/// Like [`chunked_server`], but closes the connection without the final
/// zero-length chunk.
pub async fn truncated_chunked_server(parts: Vec<Vec<u8>>) -> SocketAddr {
    serve_chunked(parts, Duration::from_millis(20), false).await
}

/// Answers `500` with a `content-length` it never delivers, then holds the
/// socket open.
pub async fn stalled_error_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if read_request(&mut socket).await.is_err() {
            return;
        }
        let head = "HTTP/1.1 500 Internal Server Error\r\ncontent-type: text/plain\r\ncontent-length: 100\r\n\r\npartial";
        if socket.write_all(head.as_bytes()).await.is_err() || socket.flush().await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    addr
}

async fn serve_chunked(parts: Vec<Vec<u8>>, gap: Duration, finish: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if read_request(&mut socket).await.is_err() {
            return;
        }
        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ntransfer-encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for part in parts {
            let mut frame = format!("{:x}\r\n", part.len()).into_bytes();
            frame.extend_from_slice(&part);
            frame.extend_from_slice(b"\r\n");
            if socket.write_all(&frame).await.is_err() || socket.flush().await.is_err() {
                return;
            }
            tokio::time::sleep(gap).await;
        }
        if finish {
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });
    addr
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(request);
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(end) = find(&request, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < end + 4 + length {
                let n = socket.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            return Ok(request);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
