use std::sync::Arc;

use lm_clients::{AnyscaleClient, Error, GenerationOverrides, InMemoryStore, LanguageModel};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SYSTEM: &str = "You are a helpful assistant. You must continue the user text directly without *any* additional interjections.";

fn client_for(server: &MockServer) -> AnyscaleClient {
    AnyscaleClient::new(
        "meta-llama/Llama-2-7b-chat-hf",
        format!("{}/v1", server.uri()),
        "test-api-key",
    )
    .expect("Failed to create Anyscale client")
}

fn completion_body(content: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            },
            {
                "index": 1,
                "message": { "role": "assistant", "content": "ignored" },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn test_first_choice_content_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_json(json!({
            "model": "meta-llama/Llama-2-7b-chat-hf",
            "messages": [
                { "role": "system", "content": SYSTEM },
                { "role": "user", "content": "Once upon a time" }
            ],
            "temperature": 0.0,
            "max_tokens": 150
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body(json!(" there was a fox."))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate("Once upon a time", &GenerationOverrides::default())
        .await
        .unwrap();

    assert_eq!(response.prompt(), "Once upon a time");
    assert_eq!(response.texts(), vec![" there was a fox."]);
}

#[tokio::test]
async fn test_overrides_reach_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "meta-llama/Llama-2-7b-chat-hf",
            "messages": [
                { "role": "system", "content": SYSTEM },
                { "role": "user", "content": "Hi" }
            ],
            "temperature": 0.5,
            "max_tokens": 20
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!("ok"))))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = GenerationOverrides::new()
        .with_temperature(0.5)
        .with_max_tokens(20);
    let response = client_for(&server).generate("Hi", &overrides).await.unwrap();
    assert_eq!(response.first_text(), "ok");
}

#[tokio::test]
async fn test_null_content_becomes_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!(null))))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate("Hi", &GenerationOverrides::default())
        .await
        .unwrap();
    assert_eq!(response.texts(), vec![""]);
}

#[tokio::test]
async fn test_empty_choices_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate("Hi", &GenerationOverrides::default())
        .await;
    assert!(matches!(result, Err(Error::Schema { .. })));
}

#[tokio::test]
async fn test_missing_message_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "index": 0 }] })),
        )
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate("Hi", &GenerationOverrides::default())
        .await;
    assert!(matches!(result, Err(Error::Schema { .. })));
}

#[tokio::test]
async fn test_non_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("upstream timeout"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate("Hi", &GenerationOverrides::default())
        .await;
    assert!(matches!(result, Err(Error::Decode { .. })));
}

#[tokio::test]
async fn test_unauthorized_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid API key" }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate("Hi", &GenerationOverrides::default())
        .await;

    match result {
        Err(Error::Provider { provider, message }) => {
            assert_eq!(provider, "Anyscale");
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("Expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_optional_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!("once"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_cache(Arc::new(InMemoryStore::new()));
    for _ in 0..3 {
        let response = client.generate("Hi", &GenerationOverrides::default()).await.unwrap();
        assert_eq!(response.first_text(), "once");
    }
}
