//! HTTP embedding encoder against a mock `/v1/embeddings` endpoint.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use kaanoon_rag::embedding::{
    EmbeddingEncoder, EncoderError, HttpEmbeddingEncoder, HttpEncoderConfig,
};

fn encoder_for(server: &ServerGuard, api_key: Option<&str>) -> HttpEmbeddingEncoder {
    HttpEmbeddingEncoder::new(HttpEncoderConfig {
        base_url: server.url(),
        model: "all-mpnet-base-v2".to_string(),
        dimension: 3,
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
    })
    .expect("client should build")
}

#[tokio::test]
async fn encode_posts_model_and_input() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", "Bearer emb-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "all-mpnet-base-v2",
            "input": ["what is anticipatory bail"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "data": [{ "object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0] }],
                "model": "all-mpnet-base-v2"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let vector = encoder_for(&server, Some("emb-key"))
        .encode("what is anticipatory bail")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vector, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn client_errors_are_rejections() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(400)
        .with_body(r#"{"error":"input must not be empty"}"#)
        .create_async()
        .await;

    let err = encoder_for(&server, None).encode("").await.unwrap_err();

    assert!(matches!(err, EncoderError::Rejected(ref msg) if msg.contains("must not be empty")));
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(500)
        .with_body("model not loaded")
        .create_async()
        .await;

    let err = encoder_for(&server, None).encode("bail").await.unwrap_err();

    assert!(matches!(err, EncoderError::Unavailable(_)));
}

#[tokio::test]
async fn missing_embedding_is_malformed() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    let err = encoder_for(&server, None).encode("bail").await.unwrap_err();

    assert!(matches!(err, EncoderError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_encoder_is_unavailable() {
    let encoder = HttpEmbeddingEncoder::new(HttpEncoderConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        model: "all-mpnet-base-v2".to_string(),
        dimension: 3,
        api_key: None,
        timeout_secs: 2,
    })
    .unwrap();

    let err = encoder.encode("bail").await.unwrap_err();

    assert!(matches!(err, EncoderError::Unavailable(_)));
}
