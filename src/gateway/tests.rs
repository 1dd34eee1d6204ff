use super::*;
use crate::test_support::StubServer;

fn local_config(base_url: &str) -> LlmConfig {
    LlmConfig::new("local", "local-model")
        .with_base_url(Some(base_url.to_string()))
        .with_temperature(0.2)
        .with_max_tokens(128)
}

#[test]
fn factory_builds_every_supported_provider() {
    let configs = [
        LlmConfig::new("openai", "gpt-4").with_api_key(Some("sk-test".into())),
        LlmConfig::new("anthropic", "claude-3-sonnet-20240229")
            .with_api_key(Some("sk-ant-test".into())),
        LlmConfig::new("local", "local-model").with_base_url(Some("http://localhost:8000".into())),
    ];
    for config in configs {
        assert!(
            create_gateway(&config).is_ok(),
            "failed to build gateway for {}",
            config.provider_tag()
        );
    }
}

#[test]
fn factory_rejects_unknown_provider() {
    let config = LlmConfig::new("cohere", "command").with_api_key(Some("key".into()));
    let err = create_gateway(&config).err().expect("unknown provider must fail");
    assert_eq!(err, ConfigError::UnsupportedProvider("cohere".to_string()));
}

#[test]
fn factory_requires_credentials_and_endpoints() {
    let err = create_gateway(&LlmConfig::new("openai", "gpt-4"))
        .err()
        .expect("missing key");
    assert_eq!(
        err,
        ConfigError::MissingApiKey {
            provider: "openai",
            env_var: "OPENAI_API_KEY"
        }
    );
    let err = create_gateway(&LlmConfig::new("local", "m"))
        .err()
        .expect("missing base url");
    assert_eq!(err, ConfigError::MissingBaseUrl { provider: "local" });
}

#[test]
fn factory_rejects_out_of_range_temperature() {
    let config = local_config("http://localhost:8000").with_temperature(3.0);
    let err = create_gateway(&config).err().expect("bad temperature");
    assert_eq!(err, ConfigError::TemperatureOutOfRange(3.0));
}

#[test]
fn local_gateway_posts_flat_payload() {
    let server = StubServer::start(vec![(200, r#"{"response":"hello there"}"#.to_string())]);
    let gateway = create_gateway(&local_config(&server.base_url)).expect("local gateway");

    let text = gateway
        .generate("Say hello", Some("Be brief"))
        .expect("generate");
    assert_eq!(text, "hello there");

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].request_line.starts_with("POST /generate "));
    let body = &requests[0].body;
    assert_eq!(body["prompt"], "Say hello");
    assert_eq!(body["system"], "Be brief");
    assert_eq!(body["temperature"], 0.2);
    assert_eq!(body["max_tokens"], 128);
}

#[test]
fn local_gateway_sends_null_system_when_absent() {
    let server = StubServer::start(vec![(200, r#"{"response":"ok"}"#.to_string())]);
    let gateway = create_gateway(&local_config(&format!("{}/", server.base_url)))
        .expect("local gateway");
    gateway.generate("p", None).expect("generate");
    let requests = server.finish();
    assert!(requests[0].request_line.starts_with("POST /generate "));
    assert!(requests[0].body["system"].is_null());
}

#[test]
fn local_gateway_fails_on_error_status() {
    let server = StubServer::start(vec![(503, r#"{"error":"overloaded"}"#.to_string())]);
    let gateway = create_gateway(&local_config(&server.base_url)).expect("local gateway");
    let err = gateway.generate("p", None).expect_err("503 must fail");
    server.finish();
    match err {
        GenerationError::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn local_gateway_fails_on_missing_response_field() {
    let server = StubServer::start(vec![(200, r#"{"text":"wrong field"}"#.to_string())]);
    let gateway = create_gateway(&local_config(&server.base_url)).expect("local gateway");
    let err = gateway.generate("p", None).expect_err("missing field");
    server.finish();
    assert!(matches!(err, GenerationError::Malformed { .. }), "{err:?}");
}

#[test]
fn local_gateway_reports_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let gateway = create_gateway(&local_config(&format!("http://{addr}"))).expect("gateway");
    let err = gateway.generate("p", None).expect_err("nothing listening");
    assert!(matches!(err, GenerationError::Transport { .. }), "{err:?}");
}

#[test]
fn chat_gateway_shapes_messages_and_reads_first_choice() {
    let server = StubServer::start(vec![(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"content":"second"}}]}"#
            .to_string(),
    )]);
    let config = LlmConfig::new("openai", "gpt-4")
        .with_api_key(Some("sk-test".into()))
        .with_base_url(Some(server.base_url.clone()));
    let gateway = create_gateway(&config).expect("chat gateway");

    let text = gateway.generate("user text", Some("system text")).expect("generate");
    assert_eq!(text, "first");

    let requests = server.finish();
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /chat/completions "));
    assert_eq!(request.headers["authorization"], "Bearer sk-test");
    assert_eq!(request.body["model"], "gpt-4");
    let messages = request.body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "system text");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "user text");
}

#[test]
fn chat_gateway_omits_system_message_when_absent() {
    let server = StubServer::start(vec![(
        200,
        r#"{"choices":[{"message":{"content":"ok"}}]}"#.to_string(),
    )]);
    let config = LlmConfig::new("openai", "gpt-4")
        .with_api_key(Some("sk-test".into()))
        .with_base_url(Some(server.base_url.clone()));
    let gateway = create_gateway(&config).expect("chat gateway");
    gateway.generate("only user", None).expect("generate");

    let requests = server.finish();
    let messages = requests[0].body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[test]
fn chat_gateway_fails_without_choices() {
    let server = StubServer::start(vec![(200, r#"{"choices":[]}"#.to_string())]);
    let config = LlmConfig::new("openai", "gpt-4")
        .with_api_key(Some("sk-test".into()))
        .with_base_url(Some(server.base_url.clone()));
    let gateway = create_gateway(&config).expect("chat gateway");
    let err = gateway.generate("p", None).expect_err("no choices");
    server.finish();
    assert!(matches!(err, GenerationError::Malformed { .. }), "{err:?}");
}

#[test]
fn messages_gateway_sends_system_field_and_reads_first_block() {
    let server = StubServer::start(vec![(
        200,
        r#"{"content":[{"type":"text","text":"block one"},{"type":"text","text":"block two"}]}"#
            .to_string(),
    )]);
    let config = LlmConfig::new("anthropic", "claude-3-sonnet-20240229")
        .with_api_key(Some("sk-ant".into()))
        .with_base_url(Some(server.base_url.clone()));
    let gateway = create_gateway(&config).expect("messages gateway");

    let text = gateway.generate("question", None).expect("generate");
    assert_eq!(text, "block one");

    let requests = server.finish();
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /v1/messages "));
    assert_eq!(request.headers["x-api-key"], "sk-ant");
    assert_eq!(request.headers["anthropic-version"], "2023-06-01");
    assert_eq!(request.body["system"], "");
    assert_eq!(request.body["max_tokens"], 4000);
    let messages = request.body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "question");
}
