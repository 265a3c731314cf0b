//! Outbound service clients.
//!
//! Each external collaborator sits behind a trait so handlers can be tested
//! with in-memory fakes. The HTTP implementations share one reqwest
//! [`Client`] carrying the configured request timeout.

pub mod mail;
pub mod media;
pub mod news;
pub mod search;
pub mod translate;
pub mod weather;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::ModuleError;

pub use mail::{EmailMessage, GmailClient, MailService};
pub use media::{MediaController, SpotifyController, VideoSearch, YoutubeClient};
pub use news::{Article, NewsApiClient, NewsProvider};
pub use search::{GoogleSearchClient, SearchHit, SearchProvider};
pub use translate::{ModelTranslator, Translation, Translator};
pub use weather::{RapidWeatherClient, WeatherProvider, WeatherReport};

/// Build the shared HTTP client used by every service client.
pub fn http_client(timeout_secs: u64) -> Result<Client, ModuleError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ModuleError::upstream("HTTP", format!("Failed to build client: {e}")))
}

/// Map a transport failure, distinguishing timeouts.
pub(crate) fn transport_error(service: &str, timeout_secs: u64) -> impl Fn(reqwest::Error) -> ModuleError + '_ {
    move |err| {
        if err.is_timeout() {
            ModuleError::Timeout(timeout_secs)
        } else {
            ModuleError::upstream(service, err)
        }
    }
}

/// Pass successful responses through; read the body of failures into the error.
pub(crate) async fn ensure_success(service: &str, response: Response) -> Result<Response, ModuleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(map_http_error(service, status, &body))
}

fn map_http_error(service: &str, status: StatusCode, body: &str) -> ModuleError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    ModuleError::upstream(service, format!("HTTP {}: {}", status.as_u16(), detail))
}

/// Fail early when a required credential is blank.
pub(crate) fn require(value: &str, what: &str) -> Result<(), ModuleError> {
    if value.trim().is_empty() {
        return Err(ModuleError::NotConfigured(what.to_string()));
    }
    Ok(())
}
