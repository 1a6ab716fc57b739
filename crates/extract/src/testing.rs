//! In-memory providers that replay scripted responses and record calls, and a
//! loopback HTTP server for exercising the real clients.

use anyhow::Result;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ingest::VideoSource;

use crate::llm::{FileState, FileStore, GenerationRequest, RemoteFile, TextGenerator, TextStream};

pub const STUB_FILE_NAME: &str = "files/stub-video";

/// Streams scripted responses, one per request; the last one repeats.
pub struct StubTextModel {
    responses: Mutex<VecDeque<Vec<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

fn owned(fragments: Vec<&str>) -> Vec<String> {
    fragments.into_iter().map(String::from).collect()
}

impl StubTextModel {
    pub fn new(fragments: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([owned(fragments)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue the fragments streamed by the following request.
    pub fn and_then(self, fragments: Vec<&str>) -> Self {
        self.responses.lock().unwrap().push_back(owned(fragments));
        self
    }

    fn next_response(&self) -> Vec<String> {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap_or_default()
        } else {
            responses.front().cloned().unwrap_or_default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for StubTextModel {
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
        self.requests.lock().unwrap().push(request);
        let fragments: Vec<Result<String>> = self.next_response().into_iter().map(Ok).collect();
        Ok(stream::iter(fragments).boxed())
    }
}

/// Upload/poll/delete stub. `states` are handed out in order: the first by
/// `upload`, the rest by successive `get` calls; the last one repeats.
pub struct StubMediaModel {
    states: Mutex<VecDeque<FileState>>,
    text: StubTextModel,
    uploads: AtomicUsize,
    polls: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    fail_delete: bool,
}

impl StubMediaModel {
    pub fn new(states: Vec<FileState>, fragments: Vec<&str>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            text: StubTextModel::new(fragments),
            uploads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            fail_delete: false,
        }
    }

    pub fn and_then(mut self, fragments: Vec<&str>) -> Self {
        self.text = self.text.and_then(fragments);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.text.request_count()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.text.last_request()
    }

    fn next_state(&self) -> FileState {
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap_or(FileState::Active)
        } else {
            states.front().copied().unwrap_or(FileState::Active)
        }
    }

    fn file(&self, mime_type: &str) -> RemoteFile {
        RemoteFile {
            name: STUB_FILE_NAME.to_string(),
            uri: format!("https://stub.test/v1beta/{}", STUB_FILE_NAME),
            mime_type: mime_type.to_string(),
            state: self.next_state(),
        }
    }
}

#[async_trait]
impl FileStore for StubMediaModel {
    async fn upload(&self, video: &VideoSource) -> Result<RemoteFile> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(self.file(&video.mime_type))
    }

    async fn get(&self, _name: &str) -> Result<RemoteFile> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file("video/mp4"))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        if self.fail_delete {
            anyhow::bail!("delete rejected");
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for StubMediaModel {
    async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
        self.text.stream(request).await
    }
}

/// One HTTP request as received by [`FakeServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string.
    pub target: String,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Scripted reply. `{base}` in header values and the body is replaced with the
/// server's base URL.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl CannedResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    /// An event stream with one `data:` event per payload.
    pub fn sse(payloads: &[&str]) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "text/event-stream".to_string())],
            body: payloads.iter().map(|p| format!("data: {}\n\n", p)).collect(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn render(&self, base_url: &str) -> Vec<u8> {
        let body = self.body.replace("{base}", base_url);
        let reason = if self.status < 400 { "OK" } else { "Error" };

        let mut out = format!(
            "HTTP/1.1 {} {}\r\ncontent-length: {}\r\nconnection: close\r\n",
            self.status,
            reason,
            body.len()
        );
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value.replace("{base}", base_url)));
        }
        out.push_str("\r\n");
        out.push_str(&body);
        out.into_bytes()
    }
}

/// Loopback HTTP/1.1 server answering one request per connection with the
/// scripted responses, in order.
pub struct FakeServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeServer {
    pub async fn start(responses: Vec<CannedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let base = base_url.clone();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                recorded.lock().unwrap().push(request);

                let _ = socket.write_all(&response.render(&base)).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

async fn fill(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<()> {
    let mut chunk = [0u8; 8192];
    let n = socket.read(&mut chunk).await.ok()?;
    if n == 0 {
        return None;
    }
    buf.extend_from_slice(&chunk[..n]);
    Some(())
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        fill(socket, &mut buf).await?;
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut pending = buf.split_off(head_end + 4);

    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let mut request = RecordedRequest {
        method,
        target,
        headers,
        body: Vec::new(),
    };

    if let Some(len) = request.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while pending.len() < len {
            fill(socket, &mut pending).await?;
        }
        pending.truncate(len);
        request.body = pending;
    } else if request
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        request.body = read_chunked(socket, pending).await?;
    }

    Some(request)
}

async fn read_chunked(socket: &mut TcpStream, mut pending: Vec<u8>) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = loop {
            if let Some(pos) = find(&pending, b"\r\n") {
                break pos;
            }
            fill(socket, &mut pending).await?;
        };

        let size_line = String::from_utf8_lossy(&pending[..line_end]).to_string();
        let size = usize::from_str_radix(size_line.split(';').next()?.trim(), 16).ok()?;
        pending.drain(..line_end + 2);
        if size == 0 {
            return Some(body);
        }

        while pending.len() < size + 2 {
            fill(socket, &mut pending).await?;
        }
        body.extend_from_slice(&pending[..size]);
        pending.drain(..size + 2);
    }
}
