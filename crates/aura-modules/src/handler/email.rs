//! Email handler.
//!
//! Every command needs the caller's delegated OAuth token; it is validated
//! before the mailbox is touched.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;

use super::{command_of, ModuleHandler};
use crate::client::{EmailMessage, MailService};
use crate::error::ModuleError;
use crate::types::{HandlerContext, SafetyLevel};

pub struct EmailHandler {
    mail: Arc<dyn MailService>,
    model: SharedModel,
    fetch_limit: u32,
}

enum Action {
    Fetch,
    Send,
    Summarize,
    Reply,
}

impl EmailHandler {
    pub fn new(mail: Arc<dyn MailService>, model: SharedModel, fetch_limit: u32) -> Self {
        Self {
            mail,
            model,
            fetch_limit,
        }
    }

    async fn fetch(&self, token: &str) -> Result<Value, ModuleError> {
        let ids = self.mail.list_messages(token, self.fetch_limit).await?;
        let mut emails = Vec::with_capacity(ids.len());
        for id in ids {
            emails.push(self.mail.get_message(token, &id).await?);
        }
        tracing::debug!(count = emails.len(), "Fetched emails");
        Ok(json!({ "emails": emails }))
    }

    async fn send(&self, token: &str, to: &str, subject: &str, body: &str) -> Result<Value, ModuleError> {
        let raw = URL_SAFE.encode(rfc822(to, subject, body));
        let id = self.mail.send_raw(token, &raw).await?;
        tracing::info!(%id, "Email sent");
        Ok(json!({ "message": "Message sent", "id": id }))
    }

    async fn original(&self, token: &str, intent: &Intent) -> Result<EmailMessage, ModuleError> {
        let id = intent
            .payload_str("email_id")
            .ok_or_else(|| ModuleError::InvalidPayload("email_id is required".to_string()))?;
        self.mail.get_message(token, id).await
    }
}

fn action_of(intent: &Intent) -> Option<Action> {
    let command = command_of(intent);
    if command.contains("reply") || command.contains("respond") {
        Some(Action::Reply)
    } else if command.contains("summar") {
        Some(Action::Summarize)
    } else if command.contains("send") || command.contains("compose") {
        Some(Action::Send)
    } else if ["fetch", "read", "check", "list", "get"]
        .iter()
        .any(|w| command.contains(w))
    {
        Some(Action::Fetch)
    } else {
        None
    }
}

/// Minimal RFC 822 message with a plain-text body.
fn rfc822(to: &str, subject: &str, body: &str) -> String {
    format!(
        "To: {to}\r\nSubject: {subject}\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{body}"
    )
}

#[async_trait]
impl ModuleHandler for EmailHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Email
    }

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Active
    }

    async fn execute(&self, intent: &Intent, ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let Some(action) = action_of(intent) else {
            return Ok(json!({ "error": "Command not recognized. Please try again." }));
        };
        let token = ctx.bearer_token.as_deref().ok_or_else(|| {
            ModuleError::AuthRequired("A bearer access token is required for email.".to_string())
        })?;
        self.mail.validate_token(token).await?;

        match action {
            Action::Fetch => self.fetch(token).await,
            Action::Send => {
                let to = intent
                    .payload_str("to_email")
                    .ok_or_else(|| ModuleError::InvalidPayload("to_email is required".to_string()))?;
                let subject = intent.payload_str_or("subject", "");
                let body = intent.payload_str_or("message_text", "");
                self.send(token, to, subject, body).await
            }
            Action::Summarize => {
                let email = self.original(token, intent).await?;
                let summary = self
                    .model
                    .generate(&format!("Summarize this email: {}", email.snippet))
                    .await?;
                Ok(json!({ "summary": summary.trim() }))
            }
            Action::Reply => {
                let email = self.original(token, intent).await?;
                let reply = self
                    .model
                    .generate(&format!("Reply to this email: {}", email.snippet))
                    .await?;
                let subject = format!("Re: {}", email.subject);
                self.send(token, &email.from, &subject, reply.trim()).await
            }
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        match action_of(intent) {
            Some(Action::Fetch) => "Fetch recent emails".to_string(),
            Some(Action::Send) => format!("Send email to {}", intent.payload_str_or("to_email", "?")),
            Some(Action::Summarize) => "Summarize an email".to_string(),
            Some(Action::Reply) => "Reply to an email".to_string(),
            None => format!("Email {}", command_of(intent)),
        }
    }
}
