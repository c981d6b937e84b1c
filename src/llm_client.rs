use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure classes the completion service can produce. None of these are
/// recovered locally; the turn that hit one is abandoned.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("completion service returned a malformed payload")]
    MalformedResponse,
}

/// Anything that can turn a prompt into response text.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// HTTP client for an Ollama-compatible generate endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(api_url: String, model: String) -> Self {
        Self {
            api_url,
            model,
            client: reqwest::Client::new(),
        }
    }
}

fn extract_text(payload: &serde_json::Value) -> Result<String, CompletionError> {
    payload
        .get("response")
        .and_then(|value| value.as_str())
        .map(|text| text.trim().to_string())
        .ok_or(CompletionError::MalformedResponse)
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.api_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(CompletionError::Status { status, body });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| CompletionError::MalformedResponse)?;
        extract_text(&payload)
    }
}
