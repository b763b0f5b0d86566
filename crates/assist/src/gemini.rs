//! Google Gemini `generateContent` backend.

use {
    async_trait::async_trait,
    chatnest_config::GeminiConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
};

use crate::{
    backend::{BackendStatus, Generation, InferenceBackend, Task, send_json},
    error::InferenceError,
};

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Secret<String>,
    model: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiBackend {
    /// `None` when no API key is configured.
    pub fn new(cfg: &GeminiConfig) -> Option<Self> {
        if !cfg.has_key() {
            return None;
        }
        let api_key = cfg.api_key.as_ref()?.expose_secret().trim().to_string();
        let model = match cfg.model.trim() {
            "" => GeminiConfig::default().model,
            m => m.to_string(),
        };
        Some(Self {
            client: reqwest::Client::new(),
            api_key: Secret::new(api_key),
            model,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn temperature(task: Task) -> f64 {
        match task {
            Task::Summarize => 0.2,
            Task::Draft => 0.4,
        }
    }
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn model(&self) -> String {
        self.model.clone()
    }

    async fn generate(&self, request: &Generation) -> Result<String, InferenceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": { "temperature": Self::temperature(request.task) },
        });
        let resp: GenerateResponse = send_json(
            self.client
                .post(url)
                .header("x-goog-api-key", self.api_key.expose_secret())
                .json(&body),
        )
        .await?;

        let text = resp
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return Err(InferenceError::Empty);
        }
        Ok(text)
    }

    async fn status(&self) -> BackendStatus {
        BackendStatus {
            running: true,
            models: vec![self.model.clone()],
            best_model: Some(self.model.clone()),
            base_url: self.api_base.clone(),
        }
    }
}
