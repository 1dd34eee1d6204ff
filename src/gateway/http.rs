//! Blocking JSON POST shared by every gateway variant.
use crate::error::GenerationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use ureq::Agent;

/// Upper bound on how much of an error body is kept for display.
const ERROR_BODY_PREVIEW_CHARS: usize = 500;

/// Build an agent that reports HTTP status codes instead of failing on them.
///
/// Proxy settings from the environment apply, except for loopback targets.
pub(super) fn agent(url: &str, timeout: Option<Duration>) -> Agent {
    let mut builder = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout);
    if is_loopback(url) {
        builder = builder.proxy(None);
    }
    Agent::new_with_config(builder.build())
}

fn is_loopback(url: &str) -> bool {
    let Ok(uri) = url.parse::<ureq::http::Uri>() else {
        return false;
    };
    match uri.host() {
        Some(host) => {
            host.eq_ignore_ascii_case("localhost")
                || host
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .parse::<IpAddr>()
                    .is_ok_and(|ip| ip.is_loopback())
        }
        None => false,
    }
}

/// POST `body` as JSON and decode a JSON reply.
///
/// Non-2xx statuses and undecodable bodies are failures; the raw body is only
/// kept as a truncated preview in the error. Errors name the `backend`, never
/// the URL.
pub(super) fn post_json<B, R>(
    agent: &Agent,
    backend: &'static str,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<R, GenerationError>
where
    B: Serialize,
    R: DeserializeOwned,
{
    let start = Instant::now();
    let mut request = agent.post(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let mut response = request
        .send_json(body)
        .map_err(|err| GenerationError::Transport {
            backend,
            source: Box::new(err),
        })?;

    let status = response.status();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|err| GenerationError::Transport {
            backend,
            source: Box::new(err),
        })?;
    tracing::debug!(
        backend,
        status = status.as_u16(),
        response_bytes = text.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "lm http round trip"
    );

    if !status.is_success() {
        return Err(GenerationError::Status {
            backend,
            status: status.as_u16(),
            body: preview(&text),
        });
    }

    serde_json::from_str(&text).map_err(|err| GenerationError::Malformed {
        backend,
        detail: format!("{err}; body: {}", preview(&text)),
    })
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= ERROR_BODY_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    format!("{head}...(truncated)")
}

/// Fail with a `Malformed` error when a required field is absent.
pub(super) fn missing(backend: &'static str, what: &str) -> GenerationError {
    GenerationError::Malformed {
        backend,
        detail: format!("response has no {what}"),
    }
}
