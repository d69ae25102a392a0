//! OpenAI chat-completions implementation of [`CompletionClient`].
//!
//! The engine-facing contract is total: `complete` never fails. Every
//! internal failure — missing credential, transport error, non-2xx status,
//! malformed body, empty choice list — is logged and absorbed into the fixed
//! fallback string, so the worst outcome a user ever sees is one fallback
//! sentence. Each request carries an HTTP deadline that funnels into the
//! same path, bounding worst-case latency.
//!
//! Model, temperature, and endpoint are fixed configuration, not runtime
//! options; the API key is read once from the process environment.

#![deny(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use tutor_engine::CompletionClient;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const AUTH_ENV_VAR: &str = "OPENAI_API_KEY";

/// What the user sees when the upstream call fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't understand that.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Internal failure taxonomy; never crosses the [`CompletionClient`]
/// boundary.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("missing {AUTH_ENV_VAR} in process environment")]
    MissingCredential,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    BadStatus { status: StatusCode, body: String },

    #[error("completion response contained no choices")]
    EmptyChoices,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Completion collaborator backed by the OpenAI chat-completions API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    temperature: f64,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiClient {
    /// Build a client with the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_key =
            std::env::var(AUTH_ENV_VAR).map_err(|_| CompletionError::MissingCredential)?;
        Self::new(api_key)
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CompletionError::Client)?;
        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_key: api_key.into(),
        })
    }

    /// Point the client at a different chat-completions endpoint. Used by
    /// tests against a local mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn try_complete(
        &self,
        message: &str,
        instruction: &str,
    ) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instruction },
                { "role": "user", "content": message },
            ],
            "temperature": self.temperature,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::BadStatus {
                status,
                body: truncate(&body, 320),
            });
        }

        let body: ChatResponse = response.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?;
        Ok(choice.message.content.trim().to_string())
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, message: &str, instruction: &str) -> String {
        match self.try_complete(message, instruction).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "completion failed, substituting fallback");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_caps_long_bodies() {
        assert_eq!(truncate("short", 320), "short");
        let long = "x".repeat(400);
        let capped = truncate(&long, 320);
        assert_eq!(capped.len(), 323);
        assert!(capped.ends_with("..."));
    }

    #[test]
    fn fixed_configuration_matches_the_service_contract() {
        let client = OpenAiClient::new("k").unwrap();
        assert_eq!(client.model, "gpt-3.5-turbo");
        assert_eq!(client.temperature, 0.7);
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
    }
}
