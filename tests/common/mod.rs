//! Shared test infrastructure for integration tests.

use serde::Deserialize;
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use tempfile::TempDir;

/// Example pair as stored in fixture.json.
#[derive(Debug, Deserialize, Clone)]
pub struct FixtureExample {
    pub input_text: String,
    pub expected_output: String,
}

/// Test fixture metadata loaded from fixture.json.
#[derive(Debug, Deserialize)]
pub struct FixtureConfig {
    pub role: String,
    #[serde(default)]
    pub examples: Vec<FixtureExample>,
}

/// Fixture directory plus an isolated config dir for `pbust`.
pub struct TestFixture {
    pub fixture_dir: PathBuf,
    pub config: FixtureConfig,
    home: TempDir,
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
}

impl TestFixture {
    /// Load a fixture by name from tests/fixtures/{name}/.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        let fixture_dir = manifest_dir().join("tests/fixtures").join(name);
        let config_path = fixture_dir.join("fixture.json");
        let config: FixtureConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path).map_err(|e| {
                anyhow::anyhow!("Failed to read {}: {}", config_path.display(), e)
            })?)?;
        Ok(Self {
            fixture_dir,
            config,
            home: TempDir::new()?,
        })
    }

    /// Canned LM responses from responses/NNN.txt, in file name order.
    pub fn responses(&self) -> anyhow::Result<Vec<String>> {
        let dir = self.fixture_dir.join("responses");
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.sort();
        paths
            .iter()
            .map(|path| Ok(std::fs::read_to_string(path)?))
            .collect()
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    /// Run `pbust` against this fixture's config dir.
    pub fn pbust(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pbust"))
            .arg("--config-dir")
            .arg(self.home.path())
            .args(args)
            .env_remove("PROMPTBUSTER_HOME")
            .env_remove("PROMPTBUSTER_NOTIFY")
            .env_remove("OPENAI_API_KEY")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()
            .expect("spawn pbust")
    }

    /// Run `pbust` and fail the test on a non-zero exit; returns stdout.
    pub fn pbust_ok(&self, args: &[&str]) -> String {
        let output = self.pbust(args);
        assert!(
            output.status.success(),
            "pbust {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Saved session snapshot as JSON.
    pub fn session(&self, name: &str) -> serde_json::Value {
        let path = self.home.path().join("sessions").join(format!("{name}.json"));
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
        serde_json::from_str(&text).expect("session JSON")
    }
}

/// Local `/generate` backend answering each connection with the next response.
pub struct MockBackend {
    pub base_url: String,
    handle: JoinHandle<Vec<serde_json::Value>>,
}

impl MockBackend {
    pub fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                requests.push(read_json_body(&mut reader));
                let body = serde_json::json!({ "response": response }).to_string();
                let reply = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).expect("write reply");
            }
            requests
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Wait until every response was served; returns the request bodies.
    pub fn finish(self) -> Vec<serde_json::Value> {
        self.handle.join().expect("mock backend thread")
    }
}

fn read_json_body(reader: &mut impl BufRead) -> serde_json::Value {
    let mut content_length = 0;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().expect("content-length");
            } else if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }
    let mut body = Vec::new();
    if chunked {
        loop {
            let mut size = String::new();
            reader.read_line(&mut size).expect("chunk size");
            let size = usize::from_str_radix(size.trim(), 16).expect("hex chunk size");
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).expect("chunk");
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
    } else {
        body.resize(content_length, 0);
        reader.read_exact(&mut body).expect("body");
    }
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
