//! Integration tests for the public endpoints

use std::net::TcpListener;
use std::sync::Arc;
use tokengate::configuration::JwtSettings;
use tokengate::registry::MemoryTokenRegistry;
use tokengate::startup::{run, Backends};
use tokengate::subjects::MemorySubjectDirectory;
use tokengate::triggers::TracingTriggerDispatcher;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let jwt_config = JwtSettings {
        secret: "integration-secret-key-at-least-32-chars".to_string(),
        issuer: "tokengate-test".to_string(),
        algorithm: "HS256".to_string(),
        registry_limit: 10,
        query_param: "jwt".to_string(),
        refresh_ttl: None,
    };
    let backends = Backends {
        registry: Arc::new(MemoryTokenRegistry::new(10)),
        subjects: Arc::new(MemorySubjectDirectory::new()),
        dispatcher: Arc::new(TracingTriggerDispatcher),
    };
    let server = run(listener, "http://localhost/".to_string(), jwt_config, backends)
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn management_api_requires_token() {
    let addr = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/jwt/list?subject_id=1", addr))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());

    let response = client
        .get(&format!("{}/api/jwt/list?subject_id=1", addr))
        .header("Authorization", "Bearer not.a.token")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_malformed_token() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .post(&format!("{}/jwt/refresh", addr))
        .json(&serde_json::json!({"token": "garbage"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(400, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "failure");
}
