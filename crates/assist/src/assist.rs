use std::{sync::Arc, time::Duration};

use {
    chatnest_common::Platform,
    chatnest_config::{AiConfig, AiProviderPreference},
    serde::{Deserialize, Serialize},
    tracing::{info, warn},
};

use crate::{
    backend::{Generation, InferenceBackend, Task},
    error::{AssistError, InferenceError, Result},
    fallback::{extractive_summary, template_draft},
    gemini::GeminiBackend,
    ollama::OllamaBackend,
    prompt,
};

/// Model name reported for the local summary fallback.
pub const EXTRACTIVE_FALLBACK: &str = "extractive-fallback";

/// Model name reported for the local draft fallback.
pub const TEMPLATE_FALLBACK: &str = "template-fallback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub model_name: String,
    pub used_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub draft: String,
    pub model_name: String,
    pub used_primary: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftRequest {
    pub original_body: String,
    pub platform: Option<Platform>,
    pub sender: String,
    /// Free-form guidance such as "decline politely".
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiStatus {
    pub provider: String,
    pub configured: bool,
    pub running: bool,
    pub models: Vec<String>,
    pub best_model: Option<String>,
    pub base_url: Option<String>,
}

/// Summaries and drafts with a guaranteed local fallback.
pub struct AiAssist {
    backend: Option<Arc<dyn InferenceBackend>>,
    timeout: Duration,
}

impl AiAssist {
    /// Pick the backend: `auto` prefers Gemini when a key is set and Ollama
    /// otherwise, `gemini` without a key and `none` use only the fallback.
    pub fn from_config(cfg: &AiConfig) -> Self {
        let gemini = || {
            GeminiBackend::new(&cfg.gemini).map(|b| Arc::new(b) as Arc<dyn InferenceBackend>)
        };
        let ollama = || Arc::new(OllamaBackend::new(&cfg.ollama)) as Arc<dyn InferenceBackend>;
        let backend = match cfg.provider {
            AiProviderPreference::None => None,
            AiProviderPreference::Gemini => gemini(),
            AiProviderPreference::Ollama => Some(ollama()),
            AiProviderPreference::Auto => gemini().or_else(|| Some(ollama())),
        };
        info!(
            preference = ?cfg.provider,
            backend = backend.as_ref().map_or("none", |b| b.name()),
            "ai backend selected"
        );
        Self::with_backend(backend, Duration::from_secs(cfg.timeout_secs.max(1)))
    }

    pub fn with_backend(backend: Option<Arc<dyn InferenceBackend>>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Fallback-only assist.
    pub fn offline() -> Self {
        Self::with_backend(None, Duration::from_secs(1))
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    pub async fn summarize(
        &self,
        body: &str,
        platform: Option<Platform>,
        sender: &str,
    ) -> Result<Summary> {
        if body.trim().is_empty() {
            return Err(AssistError::EmptyInput);
        }
        let request = Generation {
            task: Task::Summarize,
            system: prompt::SUMMARIZE_SYSTEM,
            prompt: prompt::summarize(body, platform, sender),
        };
        if let Some((summary, model_name)) = self.primary(&request).await {
            return Ok(Summary {
                summary,
                model_name,
                used_primary: true,
            });
        }
        let summary = extractive_summary(body).ok_or(AssistError::EmptyInput)?;
        Ok(Summary {
            summary,
            model_name: EXTRACTIVE_FALLBACK.into(),
            used_primary: false,
        })
    }

    pub async fn draft_reply(&self, req: &DraftRequest) -> Result<Draft> {
        if req.original_body.trim().is_empty() {
            return Err(AssistError::EmptyInput);
        }
        let request = Generation {
            task: Task::Draft,
            system: prompt::DRAFT_SYSTEM,
            prompt: prompt::draft(&req.original_body, req.platform, &req.sender, &req.instructions),
        };
        if let Some((draft, model_name)) = self.primary(&request).await {
            return Ok(Draft {
                draft,
                model_name,
                used_primary: true,
            });
        }
        let draft = template_draft(&req.original_body, req.platform, &req.sender, &req.instructions)
            .ok_or(AssistError::EmptyInput)?;
        Ok(Draft {
            draft,
            model_name: TEMPLATE_FALLBACK.into(),
            used_primary: false,
        })
    }

    pub async fn status(&self) -> AiStatus {
        let Some(backend) = &self.backend else {
            return AiStatus {
                provider: "none".into(),
                configured: false,
                running: false,
                models: Vec::new(),
                best_model: None,
                base_url: None,
            };
        };
        let status = backend.status().await;
        AiStatus {
            provider: backend.name().into(),
            configured: true,
            running: status.running,
            models: status.models,
            best_model: status.best_model,
            base_url: Some(status.base_url),
        }
    }

    /// Backend output and model name, or `None` when the fallback applies.
    async fn primary(&self, request: &Generation) -> Option<(String, String)> {
        let backend = self.backend.as_ref()?;
        let attempt = async {
            let model = backend.model().await;
            backend.generate(request).await.map(|text| (text, model))
        };
        let result = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout(self.timeout)),
        };
        match result {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "inference failed, using local fallback");
                None
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {async_trait::async_trait, secrecy::Secret};

    use {
        super::*,
        crate::backend::BackendStatus,
    };

    enum Behavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct FakeBackend(Behavior);

    #[async_trait]
    impl InferenceBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn model(&self) -> String {
            "fake-1".into()
        }

        async fn generate(&self, _request: &Generation) -> std::result::Result<String, InferenceError> {
            match self.0 {
                Behavior::Reply(text) => Ok(text.into()),
                Behavior::Fail => Err(InferenceError::unreachable("connection refused")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".into())
                },
            }
        }

        async fn status(&self) -> BackendStatus {
            BackendStatus {
                running: true,
                models: vec!["fake-1".into()],
                best_model: Some("fake-1".into()),
                base_url: "http://fake".into(),
            }
        }
    }

    fn assist(behavior: Behavior) -> AiAssist {
        AiAssist::with_backend(
            Some(Arc::new(FakeBackend(behavior))),
            Duration::from_millis(50),
        )
    }

    const BODY: &str = "Quarterly numbers are in. Revenue is up. Costs are flat. Next review is Monday.";

    #[tokio::test]
    async fn reachable_backend_is_primary() {
        let s = assist(Behavior::Reply("Revenue up, costs flat."))
            .summarize(BODY, Some(Platform::Gmail), "cfo@acme.test")
            .await
            .unwrap();
        assert_eq!(s, Summary {
            summary: "Revenue up, costs flat.".into(),
            model_name: "fake-1".into(),
            used_primary: true,
        });
    }

    #[tokio::test]
    async fn failing_backend_falls_back_to_extractive() {
        let s = assist(Behavior::Fail).summarize(BODY, None, "").await.unwrap();
        assert!(!s.used_primary);
        assert_eq!(s.model_name, EXTRACTIVE_FALLBACK);
        assert_eq!(s.summary, "Quarterly numbers are in. Revenue is up. Costs are flat.");
    }

    #[tokio::test]
    async fn slow_backend_times_out_to_template() {
        let d = assist(Behavior::Hang)
            .draft_reply(&DraftRequest {
                original_body: "Can we move the sync?".into(),
                platform: Some(Platform::Telegram),
                sender: "Rafael".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!d.used_primary);
        assert_eq!(d.model_name, TEMPLATE_FALLBACK);
        assert!(d.draft.starts_with("Hi Rafael, Thanks for your message"));
    }

    #[tokio::test]
    async fn empty_body_is_the_only_error() {
        let a = assist(Behavior::Reply("unused"));
        assert_eq!(a.summarize("  ", None, "").await, Err(AssistError::EmptyInput));
        assert_eq!(
            a.draft_reply(&DraftRequest::default()).await,
            Err(AssistError::EmptyInput)
        );
    }

    #[tokio::test]
    async fn offline_assist_reports_no_provider() {
        let a = AiAssist::offline();
        let status = a.status().await;
        assert_eq!(status.provider, "none");
        assert!(!status.configured);
        let d = a
            .draft_reply(&DraftRequest {
                original_body: "hello".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!d.used_primary);
    }

    #[test]
    fn preference_selects_backend() {
        let mut cfg = AiConfig::default();
        assert_eq!(AiAssist::from_config(&cfg).backend_name(), Some("ollama"));

        cfg.gemini.api_key = Some(Secret::new("AIza-test".into()));
        assert_eq!(AiAssist::from_config(&cfg).backend_name(), Some("gemini"));

        cfg.provider = AiProviderPreference::Ollama;
        assert_eq!(AiAssist::from_config(&cfg).backend_name(), Some("ollama"));

        cfg.provider = AiProviderPreference::None;
        assert_eq!(AiAssist::from_config(&cfg).backend_name(), None);

        cfg.provider = AiProviderPreference::Gemini;
        cfg.gemini.api_key = None;
        assert_eq!(AiAssist::from_config(&cfg).backend_name(), None);
    }

    #[tokio::test]
    async fn status_reflects_backend() {
        let status = assist(Behavior::Fail).status().await;
        assert_eq!(status.provider, "fake");
        assert!(status.configured && status.running);
        assert_eq!(status.base_url.as_deref(), Some("http://fake"));
    }
}
