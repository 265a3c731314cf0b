//! Gmail REST access with a delegated OAuth token.
//!
//! The token arrives per request from the `Authorization: Bearer` header
//! and is never stored. A missing, rejected or expired token surfaces as
//! [`ModuleError::AuthRequired`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use aura_core::config::EmailConfig;

use super::{ensure_success, transport_error};
use crate::error::ModuleError;

const SERVICE: &str = "Gmail";

/// Headers and snippet of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Confirm the token is live before any mailbox call.
    async fn validate_token(&self, token: &str) -> Result<(), ModuleError>;

    /// Most recent message ids, newest first.
    async fn list_messages(&self, token: &str, limit: u32) -> Result<Vec<String>, ModuleError>;

    async fn get_message(&self, token: &str, id: &str) -> Result<EmailMessage, ModuleError>;

    /// Send a base64url-encoded RFC 822 message and return the new id.
    async fn send_raw(&self, token: &str, raw: &str) -> Result<String, ModuleError>;
}

pub struct GmailClient {
    client: Client,
    config: EmailConfig,
    timeout_secs: u64,
}

impl GmailClient {
    pub fn new(client: Client, config: EmailConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            config,
            timeout_secs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ModuleError> {
        let response = request
            .send()
            .await
            .map_err(transport_error(SERVICE, self.timeout_secs))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ModuleError::AuthRequired(
                "Access token was rejected.".to_string(),
            ));
        }
        ensure_success(SERVICE, response).await
    }
}

#[async_trait]
impl MailService for GmailClient {
    async fn validate_token(&self, token: &str) -> Result<(), ModuleError> {
        let response = self
            .client
            .get(&self.config.token_info_url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(transport_error("OAuth tokeninfo", self.timeout_secs))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Delegated token rejected");
            return Err(ModuleError::AuthRequired("Invalid access token.".to_string()));
        }
        Ok(())
    }

    async fn list_messages(&self, token: &str, limit: u32) -> Result<Vec<String>, ModuleError> {
        let max = limit.to_string();
        let request = self
            .client
            .get(self.url("messages"))
            .bearer_auth(token)
            .query(&[("maxResults", max.as_str())]);

        let body: ListResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream(SERVICE, e))?;

        Ok(body.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, token: &str, id: &str) -> Result<EmailMessage, ModuleError> {
        let request = self
            .client
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "To"),
                ("metadataHeaders", "Subject"),
            ]);

        let body: MessageResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream(SERVICE, e))?;

        Ok(body.into_message())
    }

    async fn send_raw(&self, token: &str, raw: &str) -> Result<String, ModuleError> {
        let request = self
            .client
            .post(self.url("messages/send"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": raw }));

        let body: SendResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream(SERVICE, e))?;

        Ok(body.id)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl MessageResponse {
    fn header(&self, name: &str) -> Option<String> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }

    fn into_message(self) -> EmailMessage {
        EmailMessage {
            from: self.header("From").unwrap_or_else(|| "Unknown Sender".to_string()),
            to: self.header("To").unwrap_or_else(|| "Unknown Receiver".to_string()),
            subject: self.header("Subject").unwrap_or_else(|| "No Subject".to_string()),
            id: self.id,
            snippet: self.snippet,
        }
    }
}
