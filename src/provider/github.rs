use axum::http::HeaderMap;

use super::{build_event, HeaderSet, ProviderAdapter};
use crate::error::WebhookError;
use crate::extract::Fields;
use crate::types::{RepositoryRef, SenderRef, WebhookEvent};
use crate::verification;

const HEADERS: HeaderSet = HeaderSet {
    event: &["x-github-event"],
    delivery: &["x-github-delivery"],
    signature: &["x-hub-signature-256"],
};

const EVENTS: &[&str] = &[
    "push",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
    "issues",
    "issue_comment",
    "create",
    "delete",
    "release",
    "workflow_run",
    "check_run",
    "check_suite",
    "deployment",
    "deployment_status",
    "fork",
    "star",
    "watch",
    "ping",
];

/// GitHub: `X-GitHub-Event`, `X-GitHub-Delivery`, HMAC-SHA256 in
/// `X-Hub-Signature-256`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GithubAdapter;

impl ProviderAdapter for GithubAdapter {
    fn validate_signature(&self, payload: &[u8], signature: &str, secret: &str) -> bool {
        verification::verify_hmac_sha256(secret, payload, signature)
    }

    fn parse_event(&self, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, WebhookError> {
        build_event(headers, body, &HEADERS, action, repository, sender)
    }

    fn supported_events(&self) -> Vec<String> {
        EVENTS.iter().map(|e| e.to_string()).collect()
    }

    fn signature_headers(&self) -> &[&str] {
        HEADERS.signature
    }
}

fn action(fields: &Fields<'_>) -> String {
    fields.string(&["action"])
}

fn repository(fields: &Fields<'_>) -> Option<RepositoryRef> {
    let repo = fields.object(&["repository"])?;
    Some(RepositoryRef {
        id: repo.id(&["id"]),
        name: repo.string(&["name"]),
        full_name: repo.string(&["full_name"]),
        // Push payloads use `name` on the owner, everything else `login`.
        owner: repo.first_string(&[&["owner", "login"], &["owner", "name"]]),
        url: repo.string(&["html_url"]),
        clone_url: repo.string(&["clone_url"]),
        private: repo.flag(&["private"]),
    })
}

fn sender(fields: &Fields<'_>) -> Option<SenderRef> {
    let user = fields.object(&["sender"])?;
    let pusher = fields.object(&["pusher"]);
    Some(SenderRef {
        id: user.id(&["id"]),
        username: user.string(&["login"]),
        display_name: pusher
            .map(|p| p.string(&["name"]))
            .unwrap_or_else(|| user.string(&["name"])),
        email: pusher
            .map(|p| p.string(&["email"]))
            .unwrap_or_else(|| user.string(&["email"])),
        avatar_url: user.string(&["avatar_url"]),
    })
}
