use {
    async_trait::async_trait,
    chatnest_channels::{
        AdapterMode, ProviderAdapter, ProviderError, RawMessage, Result, SendReceipt, SendTarget,
        http::{send_json, shared_http_client},
    },
    chatnest_common::{Platform, types::split_message_id},
    chatnest_config::{GmailConfig, validate::gmail_access_token},
    futures::future::join_all,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::mime::compose_reply;

const PLATFORM: Platform = Platform::Gmail;

/// Unread inbox messages only.
const LIST_QUERY: &str = "is:unread in:inbox";

/// `users.messages.list` caps `maxResults` here.
const MAX_RESULTS: usize = 500;

pub struct GmailAdapter {
    client: reqwest::Client,
    token: Secret<String>,
    api_base: String,
    user: String,
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
struct SentMessage {
    #[serde(default)]
    id: Option<String>,
}

impl GmailAdapter {
    /// Build from config; fails when no usable access token is configured.
    pub fn new(cfg: &GmailConfig) -> Result<Self> {
        let token = gmail_access_token(cfg).map_err(|issue| ProviderError::auth(PLATFORM, issue))?;
        Ok(Self {
            client: shared_http_client().clone(),
            token,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            user: cfg.user.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/{}/{path}", self.api_base, self.user)
    }

    async fn get_message(&self, id: &str) -> Result<Value> {
        let req = self
            .client
            .get(self.url(&format!("messages/{id}")))
            .bearer_auth(self.token.expose_secret())
            .query(&[("format", "full")]);
        send_json(PLATFORM, req).await
    }
}

#[async_trait]
impl ProviderAdapter for GmailAdapter {
    fn platform(&self) -> Platform {
        PLATFORM
    }

    fn mode(&self) -> AdapterMode {
        AdapterMode::Live
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawMessage>> {
        let max_results = limit.clamp(1, MAX_RESULTS).to_string();
        let req = self
            .client
            .get(self.url("messages"))
            .bearer_auth(self.token.expose_secret())
            .query(&[("q", LIST_QUERY), ("maxResults", max_results.as_str())]);
        let list: ListResponse = send_json(PLATFORM, req).await?;
        debug!(count = list.messages.len(), "gmail: listed unread messages");

        let results = join_all(list.messages.iter().map(|m| self.get_message(&m.id))).await;
        let total = results.len();
        let mut first_err = None;
        let mut raw = Vec::with_capacity(total);
        for result in results {
            match result {
                Ok(payload) => raw.push(RawMessage::new(PLATFORM, payload)),
                Err(e) => {
                    warn!(error = %e, "gmail: skipping message that failed to load");
                    first_err.get_or_insert(e);
                },
            }
        }
        // Individual failures are tolerated; losing every message is not.
        match first_err {
            Some(e) if raw.is_empty() && total > 0 => Err(e),
            _ => Ok(raw),
        }
    }

    async fn send(&self, target: &SendTarget) -> Result<SendReceipt> {
        let to = target.recipient.trim();
        if to.is_empty() {
            return Err(ProviderError::invalid_target(
                PLATFORM,
                "a recipient address is required",
            ));
        }
        let mut payload = json!({ "raw": compose_reply(to, &target.subject, &target.body) });
        if !target.thread_id.is_empty() {
            payload["threadId"] = Value::from(target.thread_id.as_str());
        }
        let req = self
            .client
            .post(self.url("messages/send"))
            .bearer_auth(self.token.expose_secret())
            .json(&payload);
        let sent: SentMessage = send_json(PLATFORM, req).await?;
        Ok(SendReceipt {
            provider_message_id: sent.id,
        })
    }

    async fn mark_read(&self, native_id: &str) -> Result<()> {
        // Accept a qualified id as well as the bare Gmail id.
        let id = match split_message_id(native_id) {
            Ok((Platform::Gmail, native)) => native,
            _ => native_id,
        };
        let req = self
            .client
            .post(self.url(&format!("messages/{id}/modify")))
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "removeLabelIds": ["UNREAD"] }));
        let _: Value = send_json(PLATFORM, req).await?;
        Ok(())
    }
}
