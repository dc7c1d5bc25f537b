use crate::config::{GatewayConfig, ProviderConfig};
use crate::server::WebhookServer;
use crate::verification::sign_hmac_sha256;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "s3cr3t";
const PUSH: &[u8] = br#"{"ref":"refs/heads/main","repository":{"id":1,"name":"demo","full_name":"acme/demo"}}"#;

fn config() -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        default_secret: SECRET.into(),
        ..Default::default()
    }
}

fn github(uri: &str, event: &str, body: &[u8], signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-github-delivery", "d-1");
    if let Some(sig) = signature {
        builder = builder.header("x-hub-signature-256", sig);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> Value {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn accepts_signed_github_delivery() {
    let server = WebhookServer::new(config());
    let app = server.router();

    let sig = sign_hmac_sha256(SECRET, PUSH);
    let (status, body) = send(&app, github("/webhook/github", "push", PUSH, Some(sig))).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "accepted");
    assert!(body["receipt"].as_str().is_some_and(|r| !r.is_empty()));
    assert_eq!(server.queue_len().await, 1);
    assert_eq!(server.stats().accepted, 1);
}

#[tokio::test]
async fn provider_shortcut_routes() {
    let server = WebhookServer::new(config());
    let app = server.router();

    let sig = sign_hmac_sha256(SECRET, PUSH);
    let (status, _) = send(&app, github("/github", "push", PUSH, Some(sig))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.queue_len().await, 1);
}

#[tokio::test]
async fn rejects_bad_signature() {
    let server = WebhookServer::new(config());
    let app = server.router();

    let sig = sign_hmac_sha256("wrong", PUSH);
    let (status, body) = send(&app, github("/webhook/github", "push", PUSH, Some(sig))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, b"Invalid signature");
    assert_eq!(server.queue_len().await, 0);
    assert_eq!(server.stats().rejected, 1);
}

#[tokio::test]
async fn unsigned_delivery_is_accepted_unless_required() {
    let mut cfg = config();
    let server = WebhookServer::new(cfg.clone());
    let (status, _) = send(&server.router(), github("/webhook/github", "push", PUSH, None)).await;
    assert_eq!(status, StatusCode::OK);

    cfg.providers.insert(
        "github".into(),
        ProviderConfig {
            require_signature: true,
            ..Default::default()
        },
    );
    let strict = WebhookServer::new(cfg);
    let (status, body) = send(&strict.router(), github("/webhook/github", "push", PUSH, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, b"Missing signature");
}

#[tokio::test]
async fn unknown_provider_is_bad_request() {
    let server = WebhookServer::new(config());
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/gitea")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _) = send(&server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(server.queue_len().await, 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = WebhookServer::new(config());
    let app = server.router();

    for body in [&b"{not json"[..], &b"[1,2,3]"[..], &b""[..]] {
        let (status, text) = send(&app, github("/webhook/github", "push", body, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        // Never echo the payload back.
        assert_eq!(text, b"Invalid payload");
    }
    assert_eq!(server.queue_len().await, 0);
}

#[tokio::test]
async fn disabled_provider_is_not_found() {
    let mut cfg = config();
    cfg.providers.insert(
        "bitbucket".into(),
        ProviderConfig {
            enabled: false,
            ..Default::default()
        },
    );
    let server = WebhookServer::new(cfg);
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/bitbucket")
        .header("x-event-key", "repo:push")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _) = send(&server.router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filtered_event_is_ignored() {
    let mut cfg = config();
    cfg.providers.insert(
        "github".into(),
        ProviderConfig {
            events: vec!["push".into()],
            ..Default::default()
        },
    );
    let server = WebhookServer::new(cfg);
    let app = server.router();

    let body = br#"{"action":"created"}"#;
    let sig = sign_hmac_sha256(SECRET, body);
    let (status, text) = send(&app, github("/webhook/github", "star", body, Some(sig))).await;

    assert_eq!(status, StatusCode::OK);
    let text: Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(text["status"], "ignored");
    assert!(text.get("receipt").is_none());
    assert_eq!(server.queue_len().await, 0);
    assert_eq!(server.stats().ignored, 1);
}

#[tokio::test]
async fn extra_headers_must_match() {
    let mut cfg = config();
    cfg.providers.insert(
        "github".into(),
        ProviderConfig {
            headers: [("x-deploy-env".to_string(), "prod".to_string())].into(),
            ..Default::default()
        },
    );
    let server = WebhookServer::new(cfg);
    let app = server.router();
    let sig = sign_hmac_sha256(SECRET, PUSH);

    let (status, _) = send(&app, github("/webhook/github", "push", PUSH, Some(sig.clone()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = github("/webhook/github", "push", PUSH, Some(sig));
    request
        .headers_mut()
        .insert("x-deploy-env", "prod".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn saturated_queue_returns_503() {
    let cfg = GatewayConfig {
        queue_size: 2,
        ..config()
    };
    let server = WebhookServer::new(cfg);
    let app = server.router();
    let sig = sign_hmac_sha256(SECRET, PUSH);

    for _ in 0..2 {
        let (status, _) = send(&app, github("/webhook/github", "push", PUSH, Some(sig.clone()))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, github("/webhook/github", "push", PUSH, Some(sig))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(server.queue_len().await, 2);
    assert_eq!(server.stats().dropped, 1);
}

#[tokio::test]
async fn prefix_applies_to_webhook_routes_only() {
    let cfg = GatewayConfig {
        path_prefix: "/hooks/".into(),
        ..config()
    };
    let server = WebhookServer::new(cfg);
    let app = server.router();
    let sig = sign_hmac_sha256(SECRET, PUSH);

    let (status, _) = send(&app, github("/hooks/webhook/github", "push", PUSH, Some(sig.clone()))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, github("/webhook/github", "push", PUSH, Some(sig))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let health = get_json(&app, "/health").await;
    assert_eq!(health["queue_length"], 1);
}

#[tokio::test]
async fn health_and_metrics_when_stopped() {
    let server = WebhookServer::new(config());
    let app = server.router();

    let health = get_json(&app, "/health").await;
    assert_eq!(health["status"], "stopped");
    assert_eq!(health["running"], false);
    assert_eq!(health["queue_length"], 0);
    assert!(health["timestamp"].is_string());

    let metrics = get_json(&app, "/metrics").await;
    assert_eq!(metrics["status"], "stopped");
    assert_eq!(metrics["queue_capacity"], 1000);
    assert_eq!(metrics["adapters"], 3);
    assert_eq!(
        metrics["providers"],
        serde_json::json!(["bitbucket", "github", "gitlab"])
    );
    assert_eq!(metrics["events"]["received"], 0);
}

#[tokio::test]
async fn large_signed_payload_is_accepted() {
    let server = WebhookServer::new(config());
    let app = server.router();

    let body = format!(
        r#"{{"ref":"refs/heads/main","blob":"{}"}}"#,
        "a".repeat(3 * 1024 * 1024)
    );
    let sig = sign_hmac_sha256(SECRET, body.as_bytes());
    let (status, _) = send(&app, github("/webhook/github", "push", body.as_bytes(), Some(sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.queue_len().await, 1);
}

#[tokio::test]
async fn body_limit_is_configurable() {
    let server = WebhookServer::new(GatewayConfig {
        max_body_bytes: 1024,
        ..config()
    });
    let app = server.router();

    let body = format!(r#"{{"blob":"{}"}}"#, "a".repeat(4096));
    let sig = sign_hmac_sha256(SECRET, body.as_bytes());
    let (status, _) = send(&app, github("/github", "push", body.as_bytes(), Some(sig))).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(server.queue_len().await, 0);
}
