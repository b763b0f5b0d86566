//! Local Ollama `/api/chat` backend.

use std::time::Duration;

use {
    async_trait::async_trait,
    chatnest_config::OllamaConfig,
    serde::Deserialize,
    serde_json::json,
    tokio::sync::OnceCell,
    tracing::debug,
};

use crate::{
    backend::{BackendStatus, Generation, InferenceBackend, Task, send_json},
    error::InferenceError,
};

pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Tried in order when no model is pinned.
const PREFERRED_MODELS: &[&str] = &[
    "llama3.2:3b",
    "llama3.2",
    "llama3:8b",
    "llama3",
    "mistral",
    "gemma3:4b",
    "gemma3",
    "phi3",
];

/// `/api/tags` is a liveness probe as much as a listing.
const TAGS_TIMEOUT: Duration = Duration::from_secs(2);

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    pinned: Option<String>,
    discovered: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct TagsPayload {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Strip a trailing `/v1` so OpenAI-style base URLs also work.
fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string()
}

/// First preferred model that is installed, by exact name or family
/// (`llama3.2` matches `llama3.2:1b`); otherwise the first installed model.
pub fn best_model(available: &[String]) -> String {
    for &preferred in PREFERRED_MODELS {
        if available.iter().any(|a| a == preferred) {
            return preferred.to_string();
        }
        let family = preferred.split(':').next().unwrap_or(preferred);
        let tagged = format!("{family}:");
        if let Some(found) = available
            .iter()
            .find(|a| a.as_str() == family || a.starts_with(&tagged))
        {
            return found.clone();
        }
    }
    available
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

impl OllamaBackend {
    pub fn new(cfg: &OllamaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(&cfg.base_url),
            pinned: cfg
                .model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            discovered: OnceCell::new(),
        }
    }

    /// Installed model names, sorted and de-duplicated.
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let payload: TagsPayload = send_json(
            self.client
                .get(format!("{}/api/tags", self.base_url))
                .timeout(TAGS_TIMEOUT),
        )
        .await?;
        let mut models: Vec<String> = payload
            .models
            .into_iter()
            .map(|m| m.name.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        models.sort();
        models.dedup();
        Ok(models)
    }

    fn temperature(task: Task) -> f64 {
        match task {
            Task::Summarize => 0.3,
            Task::Draft => 0.5,
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    /// Pinned model, else the best installed one. Discovery runs once per
    /// backend; a failed discovery is retried on the next call.
    async fn model(&self) -> String {
        if let Some(model) = &self.pinned {
            return model.clone();
        }
        match self
            .discovered
            .get_or_try_init(|| async { self.list_models().await.map(|m| best_model(&m)) })
            .await
        {
            Ok(model) => model.clone(),
            Err(e) => {
                debug!(error = %e, "ollama model discovery failed, using default");
                DEFAULT_MODEL.to_string()
            },
        }
    }

    async fn generate(&self, request: &Generation) -> Result<String, InferenceError> {
        let body = json!({
            "model": self.model().await,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "stream": false,
            "options": { "temperature": Self::temperature(request.task) },
        });
        let resp: ChatResponse = send_json(
            self.client
                .post(format!("{}/api/chat", self.base_url))
                .json(&body),
        )
        .await?;
        let text = resp.message.content.trim();
        if text.is_empty() {
            return Err(InferenceError::Empty);
        }
        Ok(text.to_string())
    }

    async fn status(&self) -> BackendStatus {
        match self.list_models().await {
            Ok(models) => BackendStatus {
                running: true,
                best_model: Some(
                    self.pinned
                        .clone()
                        .unwrap_or_else(|| best_model(&models)),
                ),
                models,
                base_url: self.base_url.clone(),
            },
            Err(e) => {
                debug!(error = %e, "ollama not reachable");
                BackendStatus {
                    running: false,
                    base_url: self.base_url.clone(),
                    ..Default::default()
                }
            },
        }
    }
}
