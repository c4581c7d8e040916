use docs_publish::libris::LibrisClient;
use docs_publish_core::config::DocConfig;
use docs_publish_core::contract::DocGenerator;
use docs_publish_core::generate::{generate_html, GenerateError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> DocConfig {
    let mut config = DocConfig::from_value(
        "libris.json",
        json!({ "name": "Docs", "output": "build/index.html" }),
    )
    .expect("mapping config");
    config.reset_output();
    config
}

#[tokio::test]
async fn generate_posts_config_and_key_and_returns_html() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_json(json!({
            "api_key": "libris-test",
            "config": { "name": "Docs", "output": null },
            "html": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "html": "<html>docs</html>" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = LibrisClient::new("libris-test", server.uri());
    let docs = client.generate(&config(), true).await.expect("generated");
    assert_eq!(docs.html.as_deref(), Some("<html>docs</html>"));
}

#[tokio::test]
async fn api_errors_become_generator_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid api key" })))
        .mount(&server)
        .await;

    let client = LibrisClient::new("wrong", format!("{}/", server.uri()));
    let err = client.generate(&config(), true).await.unwrap_err();
    match err {
        GenerateError::Generator(msg) => {
            assert!(msg.contains("401") && msg.contains("invalid api key"), "got: {msg}")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn response_without_html_fails_the_generation_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("libris.json");
    std::fs::write(&config_path, "{}").unwrap();

    let client = LibrisClient::new("libris-test", server.uri());
    let err = generate_html(&client, &config_path, "libris.json")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::MissingHtml), "got: {err:?}");
}

#[test]
fn debug_hides_the_api_key() {
    let client = LibrisClient::new("libris-secret", "http://localhost");
    assert!(!format!("{client:?}").contains("libris-secret"));
}
