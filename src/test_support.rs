//! Test doubles for the gateway seam.
use crate::error::GenerationError;
use crate::gateway::Gateway;
use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// One prompt the engine handed to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub(crate) prompt: String,
    pub(crate) system_prompt: Option<String>,
}

/// Gateway that replays canned replies and records every prompt.
pub(crate) struct StubGateway {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl StubGateway {
    pub(crate) fn replying(replies: &[&str]) -> Self {
        Self::with_results(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub(crate) fn with_results(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded calls; stays valid after the gateway is boxed.
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }
}

impl Gateway for StubGateway {
    fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
        });
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| panic!("stub gateway ran out of replies"))
    }
}

/// A request captured by [`StubServer`].
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub(crate) request_line: String,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) body: serde_json::Value,
}

/// Minimal HTTP/1.1 server answering one canned reply per connection.
pub(crate) struct StubServer {
    pub(crate) base_url: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl StubServer {
    pub(crate) fn start(replies: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub server addr");
        let handle = std::thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().expect("accept connection");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                captured.push(read_request(&mut reader));
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).expect("write reply");
                stream.flush().expect("flush reply");
            }
            captured
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Wait for every canned reply to be served and return the requests.
    pub(crate) fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().expect("stub server thread")
    }
}

fn read_request(reader: &mut impl BufRead) -> CapturedRequest {
    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("read request line");
    let mut headers = BTreeMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    let body = if let Some(length) = headers.get("content-length") {
        let length: usize = length.parse().expect("content-length");
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).expect("read body");
        body
    } else if headers
        .get("transfer-encoding")
        .is_some_and(|value| value.eq_ignore_ascii_case("chunked"))
    {
        read_chunked(reader)
    } else {
        Vec::new()
    };
    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("request body is JSON")
    };
    CapturedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    }
}

fn read_chunked(reader: &mut impl BufRead) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).expect("read chunk size");
        let size = usize::from_str_radix(size_line.trim(), 16).expect("chunk size");
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk).expect("read chunk");
        if size == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..size]);
    }
    body
}
