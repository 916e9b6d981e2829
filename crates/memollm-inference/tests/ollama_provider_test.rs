//! HTTP-level tests for the Ollama provider.

use std::time::Duration;

use memollm_core::{
    CompletionRequest, EmbeddingRequest, LlmProvider, Message, ProviderConfig, ProviderType,
};
use memollm_inference::OllamaProvider;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OllamaProvider {
    OllamaProvider::new(ProviderConfig::new(ProviderType::Ollama).with_host(server.uri()))
        .unwrap()
        .with_backoff_base(Duration::from_millis(1))
}

#[tokio::test]
async fn test_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "options": {"num_predict": 32}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Hi!"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 7,
            "eval_count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = provider(&server)
        .complete(&CompletionRequest::new(vec![Message::user("Hello")]).with_max_tokens(32))
        .await
        .unwrap();
    assert_eq!(resp.content, "Hi!");
    assert_eq!(resp.usage.total_tokens, 9);
    assert_eq!(resp.finish_reason, "stop");
}

#[tokio::test]
async fn test_embeddings_one_call_per_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "nomic-embed-text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2, 0.3]],
            "prompt_eval_count": 3
        })))
        .expect(3)
        .mount(&server)
        .await;

    let resp = provider(&server)
        .embed(&EmbeddingRequest::new(vec!["a".into(), "b".into(), "c".into()]))
        .await
        .unwrap();
    assert_eq!(resp.embeddings.len(), 3);
    assert_eq!(resp.usage.prompt_tokens, 9);
}

#[tokio::test]
async fn test_models_from_tags_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189},
                {"name": "nomic-embed-text:latest", "size": 274302450}
            ]
        })))
        .mount(&server)
        .await;

    let models = provider(&server).available_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest", "nomic-embed-text:latest"]);
}

#[tokio::test]
async fn test_health_check_hits_version_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.5.7"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let version = provider(&server).check_health().await.unwrap();
    assert_eq!(version, "0.5.7");
}
