#![allow(dead_code)]

//! Minimal HTTP/1.1 mock servers for exercising the command layer without a
//! real deployment. Responses are served in order (the last one repeats),
//! and every received request is captured for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: body.into(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn render(&self) -> Vec<u8> {
        let mut text = format!("HTTP/1.1 {} MOCK\r\n", self.status);
        for (name, value) in &self.headers {
            text.push_str(&format!("{name}: {value}\r\n"));
        }
        text.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        text.push_str("Connection: close\r\n\r\n");
        text.push_str(&self.body);
        text.into_bytes()
    }
}

/// One request as received on the wire.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    /// Path plus query string, exactly as sent.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn parse_request(raw: &[u8]) -> ReceivedRequest {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = match text.split_once("\r\n\r\n") {
        Some((head, body)) => (head, body),
        None => (text.as_ref(), ""),
    };
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let target = parts.next().unwrap_or_default().to_owned();
    let headers = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(n, v)| (n.trim().to_owned(), v.trim().to_owned()))
        })
        .collect();
    ReceivedRequest {
        method,
        target,
        headers,
        body: body.to_owned(),
    }
}

fn content_length(raw: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(raw);
    text.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn head_complete(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn next_response(queue: &Mutex<VecDeque<MockResponse>>) -> MockResponse {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().expect("at least one canned response")
    }
}

/// Async mock server for tests running inside a tokio runtime.
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockServer {
    pub async fn start(responses: Vec<MockResponse>) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let captured = requests.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let captured = captured.clone();
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut raw = Vec::new();
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => n,
                        };
                        raw.extend_from_slice(&buf[..n]);
                        if let Some(head_len) = head_complete(&raw) {
                            let body_len = content_length(&raw[..head_len]).unwrap_or(0);
                            if raw.len() >= head_len + body_len {
                                break;
                            }
                        }
                    }
                    captured.lock().unwrap().push(parse_request(&raw));
                    let response = next_response(&queue);
                    if let Some(delay) = response.delay {
                        tokio::time::sleep(delay).await;
                    }
                    let _ = stream.write_all(&response.render()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        MockServer { url, requests }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Thread-backed mock server for tests exercising the blocking client
/// (which must run outside any async runtime).
pub struct ThreadedMockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl ThreadedMockServer {
    pub fn start(responses: Vec<MockResponse>) -> ThreadedMockServer {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let captured = requests.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => return,
                };
                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    raw.extend_from_slice(&buf[..n]);
                    if let Some(head_len) = head_complete(&raw) {
                        let body_len = content_length(&raw[..head_len]).unwrap_or(0);
                        if raw.len() >= head_len + body_len {
                            break;
                        }
                    }
                }
                captured.lock().unwrap().push(parse_request(&raw));
                let response = next_response(&queue);
                if let Some(delay) = response.delay {
                    std::thread::sleep(delay);
                }
                let _ = stream.write_all(&response.render());
            }
        });

        ThreadedMockServer { url, requests }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
