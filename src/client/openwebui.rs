//! OpenWebUI chat-completions client.
//!
//! Sends the full message history in one POST and returns the first choice.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use super::ChatTransport;
use crate::config::ApiSettings;
use crate::protocol::{ChatRequest, ChatResponse, Turn};

const COMPLETIONS_PATH: &str = "/api/chat/completions";

/// Returned in place of a reply when the backend answers with no choices.
pub const NO_RESPONSE_FALLBACK: &str = "⚠️ No response received from OpenWebUI";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("failed to send request to {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenWebUI request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse OpenWebUI response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Client for an OpenWebUI server.
pub struct OpenWebUiClient {
    url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenWebUiClient {
    /// Create a client from resolved API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self::with_client(settings, client))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(settings: &ApiSettings, client: Client) -> Self {
        Self {
            url: completions_url(&settings.host),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            client,
        }
    }
}

#[async_trait]
impl ChatTransport for OpenWebUiClient {
    async fn send_chat(&self, messages: &[Turn]) -> Result<String, ClientError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        debug!(
            "POST {} (model: {}, {} message(s))",
            self.url,
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Request {
                url: self.url.clone(),
                source,
            })?;
        debug!("Response status {} ({} bytes)", status, body.len());

        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        parse_completion(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn completions_url(host: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), COMPLETIONS_PATH)
}

/// Extract the reply text from a completion body.
///
/// An empty `choices` array is not an error; it yields
/// [`NO_RESPONSE_FALLBACK`].
pub fn parse_completion(body: &str) -> Result<String, ClientError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(ClientError::Decode)?;
    Ok(response
        .first_content()
        .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string()))
}
