//! Mailbox collaborator — the narrow interface the pipeline consumes,
//! plus a Gmail REST implementation.
//!
//! Authentication is out of scope here: `GmailMailbox` is constructed
//! from an already-obtained OAuth access token.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, MailboxError};
use crate::pipeline::types::{Message, MessageRef};

/// Mailbox operations used by the pipeline and batch runner.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List all currently-unread inbox messages.
    async fn list_unread(&self) -> Result<Vec<MessageRef>, MailboxError>;

    /// Fetch one full message by id.
    async fn get(&self, id: &str) -> Result<Message, MailboxError>;

    /// Persist an unsent draft. Returns the mailbox's draft id.
    async fn create_draft(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, MailboxError>;

    /// Clear the unread flag on a message.
    async fn clear_unread(&self, id: &str) -> Result<(), MailboxError>;
}

// ── Gmail REST client ───────────────────────────────────────────────

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail mailbox over the REST API.
pub struct GmailMailbox {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl GmailMailbox {
    pub fn new(access_token: SecretString) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            base_url: GMAIL_API_BASE.to_string(),
            access_token,
        })
    }

    /// Point the client at a different base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MailboxError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(MailboxError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_unread(&self) -> Result<Vec<MessageRef>, MailboxError> {
        let response = self
            .http
            .get(format!("{}/messages", self.base_url))
            .query(&[("labelIds", "INBOX"), ("labelIds", "UNREAD")])
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        let parsed: ListResponse = Self::check(response).await?.json().await?;
        Ok(parsed
            .messages
            .into_iter()
            .map(|m| MessageRef {
                id: m.id,
                thread_id: m.thread_id,
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Message, MailboxError> {
        let response = self
            .http
            .get(format!("{}/messages/{id}", self.base_url))
            .query(&[("format", "full")])
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        let raw: ApiMessage = Self::check(response).await?.json().await?;
        Ok(message_from_api(raw))
    }

    async fn create_draft(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, MailboxError> {
        let raw = build_raw_message(to, subject, body);
        let encoded = URL_SAFE_NO_PAD.encode(raw.as_bytes());

        let response = self
            .http
            .post(format!("{}/drafts", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({ "message": { "raw": encoded } }))
            .send()
            .await?;
        let created: DraftResponse = Self::check(response).await?.json().await?;
        debug!(draft_id = %created.id, "Draft stored");
        Ok(created.id)
    }

    async fn clear_unread(&self, id: &str) -> Result<(), MailboxError> {
        let response = self
            .http
            .post(format!("{}/messages/{id}/modify", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<ApiMessageRef>,
}

#[derive(Debug, Deserialize)]
struct ApiMessageRef {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
    payload: Option<ApiPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    headers: Vec<ApiHeader>,
    body: Option<ApiBody>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    body: Option<ApiBody>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    id: String,
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn message_from_api(raw: ApiMessage) -> Message {
    let payload = raw.payload.unwrap_or_default();
    let subject = find_header(&payload.headers, "Subject").unwrap_or_default();
    let sender = find_header(&payload.headers, "From").unwrap_or_default();
    let body = extract_body_text(&payload);

    Message {
        id: raw.id,
        thread_id: raw.thread_id,
        subject,
        body,
        sender,
    }
}

/// Find a header value by name (case-insensitive).
fn find_header(headers: &[ApiHeader], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// Plain-text body: the top-level body data when present, otherwise
/// the first text/plain MIME part.
fn extract_body_text(payload: &ApiPayload) -> String {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_ref()) {
        return decode_base64url(data);
    }
    find_text_part(&payload.parts).unwrap_or_default()
}

fn find_text_part(parts: &[ApiPart]) -> Option<String> {
    for part in parts {
        if part.mime_type == "text/plain" {
            if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_ref()) {
                return Some(decode_base64url(data));
            }
        }
        if let Some(text) = find_text_part(&part.parts) {
            return Some(text);
        }
    }
    None
}

/// Decode base64url body data; the API emits both padded and unpadded
/// forms.
fn decode_base64url(encoded: &str) -> String {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Build the RFC 2822 message the drafts endpoint expects. Header
/// values are stripped of CR/LF to block header injection.
fn build_raw_message(to: &str, subject: &str, body: &str) -> String {
    let safe_to = to.replace(['\r', '\n'], " ");
    let safe_subject = subject.replace(['\r', '\n'], " ");
    format!(
        "To: {safe_to}\r\nSubject: {safe_subject}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    )
}
