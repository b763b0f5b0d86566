use {async_trait::async_trait, serde::Serialize};

use crate::error::InferenceError;

/// What a generation is for; backends tune sampling per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Summarize,
    Draft,
}

/// A single non-streaming generation request.
#[derive(Debug, Clone)]
pub struct Generation {
    pub task: Task,
    pub system: &'static str,
    pub prompt: String,
}

/// Availability report for the active backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendStatus {
    pub running: bool,
    pub models: Vec<String>,
    pub best_model: Option<String>,
    pub base_url: String,
}

/// An external inference service.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short provider name (`gemini`, `ollama`).
    fn name(&self) -> &'static str;

    /// Model that the next generation will use.
    async fn model(&self) -> String;

    async fn generate(&self, request: &Generation) -> Result<String, InferenceError>;

    async fn status(&self) -> BackendStatus;
}

/// Longest error body kept from a failed backend response.
const MAX_ERROR_BODY: usize = 200;

/// Send a request and decode its JSON body, mapping transport and HTTP
/// failures onto [`InferenceError`].
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, InferenceError> {
    let resp = request.send().await.map_err(|e| {
        if e.is_timeout() {
            InferenceError::unreachable(format!("request timed out: {}", e.without_url()))
        } else {
            InferenceError::unreachable(e.without_url())
        }
    })?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(InferenceError::Http {
            status: status.as_u16(),
            body: body.trim().chars().take(MAX_ERROR_BODY).collect(),
        });
    }
    resp.json::<T>().await.map_err(InferenceError::decode)
}
