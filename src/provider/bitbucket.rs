use axum::http::HeaderMap;

use super::{build_event, HeaderSet, ProviderAdapter};
use crate::error::WebhookError;
use crate::extract::Fields;
use crate::types::{RepositoryRef, SenderRef, WebhookEvent};
use crate::verification;

const HEADERS: HeaderSet = HeaderSet {
    event: &["x-event-key"],
    delivery: &["x-hook-uuid", "x-request-uuid"],
    signature: &["x-hub-signature-256", "x-hub-signature"],
};

const EVENTS: &[&str] = &[
    "repo:push",
    "repo:fork",
    "repo:updated",
    "repo:commit_comment_created",
    "repo:commit_status_created",
    "repo:commit_status_updated",
    "issue:created",
    "issue:updated",
    "issue:comment_created",
    "pullrequest:created",
    "pullrequest:updated",
    "pullrequest:approved",
    "pullrequest:unapproved",
    "pullrequest:fulfilled",
    "pullrequest:rejected",
    "pullrequest:comment_created",
];

/// Bitbucket Cloud: `X-Event-Key`, `X-Hook-UUID`, HMAC-SHA256 in
/// `X-Hub-Signature`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitbucketAdapter;

impl ProviderAdapter for BitbucketAdapter {
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

// Bitbucket encodes the action in the event key; the payload only carries
// one for a few app-defined hooks.
fn action(fields: &Fields<'_>) -> String {
    fields.string(&["action"])
}

fn repository(fields: &Fields<'_>) -> Option<RepositoryRef> {
    let repo = fields.object(&["repository"])?;
    let clone_url = repo
        .array(&["links", "clone"])
        .iter()
        .map(Fields::new)
        .find(|link| link.string(&["name"]) == "https")
        .map(|link| link.string(&["href"]))
        .unwrap_or_default();

    Some(RepositoryRef {
        id: repo.string(&["uuid"]),
        name: repo.string(&["name"]),
        full_name: repo.string(&["full_name"]),
        owner: repo.first_string(&[
            &["owner", "username"],
            &["owner", "nickname"],
            &["owner", "display_name"],
        ]),
        url: repo.string(&["links", "html", "href"]),
        clone_url,
        private: repo.flag(&["is_private"]),
    })
}

fn sender(fields: &Fields<'_>) -> Option<SenderRef> {
    let actor = fields.object(&["actor"])?;
    Some(SenderRef {
        id: actor.first_string(&[&["uuid"], &["account_id"]]),
        username: actor.first_string(&[&["username"], &["nickname"]]),
        display_name: actor.string(&["display_name"]),
        email: String::new(),
        avatar_url: actor.string(&["links", "avatar", "href"]),
    })
}
