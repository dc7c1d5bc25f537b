use axum::http::HeaderMap;

use super::{build_event, HeaderSet, ProviderAdapter};
use crate::error::WebhookError;
use crate::extract::Fields;
use crate::types::{RepositoryRef, SenderRef, WebhookEvent};
use crate::verification;

const HEADERS: HeaderSet = HeaderSet {
    event: &["x-gitlab-event"],
    delivery: &["x-gitlab-event-uuid", "x-gitlab-webhook-uuid"],
    signature: &["x-gitlab-token"],
};

const EVENTS: &[&str] = &[
    "Push Hook",
    "Tag Push Hook",
    "Issue Hook",
    "Confidential Issue Hook",
    "Note Hook",
    "Confidential Note Hook",
    "Merge Request Hook",
    "Wiki Page Hook",
    "Pipeline Hook",
    "Job Hook",
    "Deployment Hook",
    "Release Hook",
];

/// `visibility_level` GitLab reports for private projects.
const VISIBILITY_PRIVATE: i64 = 0;

/// GitLab: `X-Gitlab-Event`, `X-Gitlab-Event-UUID`, plain shared token in
/// `X-Gitlab-Token`. There is no body signature; the token is compared as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitlabAdapter;

impl ProviderAdapter for GitlabAdapter {
    fn validate_signature(&self, _payload: &[u8], signature: &str, secret: &str) -> bool {
        verification::verify_token(secret, signature)
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
    fields.first_string(&[&["object_attributes", "action"], &["action"]])
}

fn repository(fields: &Fields<'_>) -> Option<RepositoryRef> {
    if let Some(project) = fields.object(&["project"]) {
        return Some(RepositoryRef {
            id: project.id(&["id"]),
            name: project.string(&["name"]),
            full_name: project.string(&["path_with_namespace"]),
            owner: project.string(&["namespace"]),
            url: project.string(&["web_url"]),
            clone_url: project.string(&["git_http_url"]),
            private: project.integer(&["visibility_level"]) == Some(VISIBILITY_PRIVATE),
        });
    }

    // Older hooks only carry the legacy `repository` block.
    let repo = fields.object(&["repository"])?;
    Some(RepositoryRef {
        name: repo.string(&["name"]),
        url: repo.first_string(&[&["homepage"], &["url"]]),
        clone_url: repo.string(&["git_http_url"]),
        private: repo.integer(&["visibility_level"]) == Some(VISIBILITY_PRIVATE),
        ..Default::default()
    })
}

fn sender(fields: &Fields<'_>) -> Option<SenderRef> {
    if let Some(user) = fields.object(&["user"]) {
        return Some(SenderRef {
            id: user.id(&["id"]),
            username: user.string(&["username"]),
            display_name: user.string(&["name"]),
            email: user.string(&["email"]),
            avatar_url: user.string(&["avatar_url"]),
        });
    }

    // Push and tag hooks flatten the user into top-level fields.
    let username = fields.string(&["user_username"]);
    if username.is_empty() {
        return None;
    }
    Some(SenderRef {
        id: fields.id(&["user_id"]),
        username,
        display_name: fields.string(&["user_name"]),
        email: fields.string(&["user_email"]),
        avatar_url: fields.string(&["user_avatar"]),
    })
}
