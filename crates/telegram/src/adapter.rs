use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use {
    async_trait::async_trait,
    chatnest_channels::{
        AdapterMode, ProviderAdapter, ProviderError, RawMessage, Result, SendReceipt, SendTarget,
        http::{classify_status, classify_transport, retry_after_ms_from_headers},
    },
    chatnest_common::Platform,
    chatnest_config::{TelegramConfig, validate::telegram_token},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::chunk::{MAX_MESSAGE_LEN, chunk_text};

const PLATFORM: Platform = Platform::Telegram;

/// Client timeout without a proxy.
const DIRECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Proxied requests get more headroom.
const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// `getUpdates` returns at most this many updates per call.
const MAX_UPDATES: usize = 100;

pub struct TelegramAdapter {
    client: reqwest::Client,
    token: Secret<String>,
    api_base: String,
    /// Highest `update_id` seen plus one; zero until the first update.
    next_offset: AtomicI64,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl TelegramAdapter {
    /// Build from config. An unusable token or proxy URL fails construction.
    pub fn new(cfg: &TelegramConfig) -> Result<Self> {
        let token = telegram_token(cfg)
            .map_err(|issue| ProviderError::auth(PLATFORM, issue))?
            .expose_secret()
            .trim()
            .to_string();

        let proxy_url = cfg
            .proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let mut builder = reqwest::Client::builder();
        builder = match proxy_url {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url).map_err(|e| {
                    ProviderError::transport(PLATFORM, format!("invalid proxy url: {e}"))
                })?;
                info!("telegram: routing requests through proxy");
                builder.proxy(proxy).timeout(PROXY_TIMEOUT)
            },
            None => builder.timeout(DIRECT_TIMEOUT),
        };
        let client = builder
            .build()
            .map_err(|e| ProviderError::transport(PLATFORM, e))?;

        Ok(Self {
            client,
            token: Secret::new(token),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            next_offset: AtomicI64::new(0),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    /// POST a Bot API method and unwrap the `{"ok": ...}` envelope.
    async fn call(&self, method: &str, params: &Value) -> Result<Value> {
        let resp = self
            .client
            .post(self.url(method))
            .json(params)
            .send()
            .await
            // The request URL embeds the bot token.
            .map_err(|e| classify_transport(PLATFORM, &e.without_url()))?;
        let status = resp.status();
        let retry_after_ms = retry_after_ms_from_headers(resp.headers());
        let text = resp
            .text()
            .await
            .map_err(|e| classify_transport(PLATFORM, &e.without_url()))?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => unwrap_envelope(envelope),
            Err(_) if !status.is_success() => {
                Err(classify_status(PLATFORM, status, retry_after_ms, &text))
            },
            Err(e) => Err(ProviderError::decode(PLATFORM, e)),
        }
    }
}

fn unwrap_envelope(envelope: Envelope) -> Result<Value> {
    if envelope.ok {
        return Ok(envelope.result);
    }
    let description = envelope
        .description
        .unwrap_or_else(|| "unknown error".to_string());
    Err(match envelope.error_code {
        Some(401 | 403) => ProviderError::auth(PLATFORM, description),
        Some(429) => ProviderError::rate_limited(
            PLATFORM,
            envelope
                .parameters
                .and_then(|p| p.retry_after)
                .and_then(|s| s.checked_mul(1_000)),
        ),
        _ => ProviderError::api(PLATFORM, description),
    })
}

/// Chat id from `telegram:<chat>:<message>`, `<chat>:<message>` or
/// `telegram:chat:<chat>`.
fn chat_from_ids(message_id: Option<&str>, thread_id: &str) -> Option<String> {
    if let Some(chat) = thread_id.strip_prefix("telegram:chat:") {
        if !chat.is_empty() {
            return Some(chat.to_string());
        }
    }
    let id = message_id?;
    let id = id.strip_prefix("telegram:").unwrap_or(id);
    let (chat, _) = id.rsplit_once(':')?;
    (!chat.is_empty()).then(|| chat.to_string())
}

/// Native message id to reply to, when the target names one.
fn reply_message_id(message_id: Option<&str>) -> Option<i64> {
    message_id?.rsplit_once(':')?.1.parse().ok()
}

#[async_trait]
impl ProviderAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        PLATFORM
    }

    fn mode(&self) -> AdapterMode {
        AdapterMode::Live
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawMessage>> {
        let mut params = json!({
            "timeout": 0,
            "limit": limit.clamp(1, MAX_UPDATES),
            "allowed_updates": ["message"],
        });
        let offset = self.next_offset.load(Ordering::Acquire);
        if offset > 0 {
            params["offset"] = Value::from(offset);
        }

        let result = self.call("getUpdates", &params).await?;
        let updates = match result {
            Value::Array(updates) => updates,
            _ => Vec::new(),
        };

        let mut raw = Vec::new();
        let mut highest = None;
        for update in updates {
            if let Some(id) = update.get("update_id").and_then(Value::as_i64) {
                highest = highest.max(Some(id));
            }
            let Some(message) = update.get("message") else {
                continue;
            };
            let has_text = ["text", "caption"].iter().any(|k| {
                message
                    .get(*k)
                    .and_then(Value::as_str)
                    .is_some_and(|t| !t.trim().is_empty())
            });
            if has_text {
                raw.push(RawMessage::new(PLATFORM, message.clone()));
            }
        }
        if let Some(id) = highest {
            self.next_offset.fetch_max(id + 1, Ordering::AcqRel);
        }
        debug!(count = raw.len(), "telegram: fetched updates");

        raw.sort_by_key(|m| std::cmp::Reverse(m.payload.get("date").and_then(Value::as_i64)));
        raw.truncate(limit);
        Ok(raw)
    }

    async fn send(&self, target: &SendTarget) -> Result<SendReceipt> {
        let chat_id = Some(target.chat_id.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| chat_from_ids(target.message_id.as_deref(), &target.thread_id))
            .ok_or_else(|| ProviderError::invalid_target(PLATFORM, "a chat id is required"))?;

        let mut reply_to = reply_message_id(target.message_id.as_deref());
        let mut last_id = None;
        for chunk in chunk_text(&target.body, MAX_MESSAGE_LEN) {
            let mut params = json!({ "chat_id": chat_id, "text": chunk });
            if let Some(id) = reply_to.take() {
                params["reply_parameters"] =
                    json!({ "message_id": id, "allow_sending_without_reply": true });
            }
            let sent = self.call("sendMessage", &params).await?;
            last_id = sent.get("message_id").and_then(Value::as_i64);
        }
        Ok(SendReceipt {
            provider_message_id: last_id.map(|id| id.to_string()),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        chatnest_channels::{ProviderErrorKind, normalize},
        mockito::Matcher,
        rstest::rstest,
    };

    use super::*;

    const TOKEN: &str = "123456:ABC-def_ghi";

    fn adapter(base: &str) -> TelegramAdapter {
        TelegramAdapter::new(&TelegramConfig {
            bot_token: Some(Secret::new(TOKEN.into())),
            api_base: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn path(method: &str) -> String {
        format!("/bot{TOKEN}/{method}")
    }

    #[rstest]
    #[case(None, "telegram:chat:1003", Some("1003"))]
    #[case(Some("telegram:-100200:77"), "", Some("-100200"))]
    #[case(Some("1003:77"), "", Some("1003"))]
    #[case(Some("77"), "", None)]
    #[case(None, "", None)]
    fn chat_ids_are_recovered(
        #[case] message_id: Option<&str>,
        #[case] thread_id: &str,
        #[case] want: Option<&str>,
    ) {
        assert_eq!(chat_from_ids(message_id, thread_id).as_deref(), want);
    }

    #[test]
    fn bad_proxy_fails_construction() {
        let err = TelegramAdapter::new(&TelegramConfig {
            bot_token: Some(Secret::new(TOKEN.into())),
            proxy_url: Some("not a url".into()),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("invalid proxy url"));
    }

    #[tokio::test]
    async fn fetch_skips_non_text_and_advances_offset() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", path("getUpdates").as_str())
            .match_body(Matcher::PartialJson(json!({"timeout": 0, "limit": 10})))
            .with_body(
                r#"{"ok": true, "result": [
                    {"update_id": 500, "message": {"message_id": 1, "date": 1705744700,
                        "chat": {"id": 1003, "type": "private"}, "from": {"id": 1003, "first_name": "Rafael"},
                        "text": "older"}},
                    {"update_id": 501, "message": {"message_id": 2, "date": 1705744750,
                        "chat": {"id": 1003, "type": "private"}, "from": {"id": 1003, "first_name": "Rafael"},
                        "sticker": {"file_id": "x"}}},
                    {"update_id": 502, "message": {"message_id": 3, "date": 1705744800,
                        "chat": {"id": -100200, "type": "supergroup", "title": "Ops"},
                        "from": {"id": 9, "first_name": "Lin"}, "caption": "see photo"}}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let tg = adapter(&server.url());
        let raw = tg.fetch(10).await.unwrap();
        first.assert_async().await;

        let msgs: Vec<_> = raw.iter().map(normalize).collect();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].id, "telegram:-100200:3");
        assert_eq!(msgs[0].channel, "Ops");
        assert_eq!(msgs[0].body, "Lin: see photo");
        assert_eq!(msgs[1].id, "telegram:1003:1");

        let second = server
            .mock("POST", path("getUpdates").as_str())
            .match_body(Matcher::PartialJson(json!({"offset": 503})))
            .with_body(r#"{"ok": true, "result": []}"#)
            .create_async()
            .await;
        assert!(tg.fetch(10).await.unwrap().is_empty());
        second.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_envelope_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path("getUpdates").as_str())
            .with_status(401)
            .with_body(r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#)
            .create_async()
            .await;
        let err = adapter(&server.url()).fetch(5).await.unwrap_err();
        assert_eq!(err.cause, ProviderErrorKind::Auth("Unauthorized".into()));
        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn flood_control_carries_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path("getUpdates").as_str())
            .with_status(429)
            .with_body(
                r#"{"ok": false, "error_code": 429, "description": "Too Many Requests",
                    "parameters": {"retry_after": 3}}"#,
            )
            .create_async()
            .await;
        let err = adapter(&server.url()).fetch(5).await.unwrap_err();
        assert_eq!(err.cause, ProviderErrorKind::RateLimited {
            retry_after_ms: Some(3000)
        });
    }

    #[tokio::test]
    async fn non_json_failure_falls_back_to_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", path("getUpdates").as_str())
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;
        let err = adapter(&server.url()).fetch(5).await.unwrap_err();
        assert!(matches!(err.cause, ProviderErrorKind::Api(ref d) if d.contains("502")));
    }

    #[tokio::test]
    async fn send_replies_to_chat_from_thread() {
        let mut server = mockito::Server::new_async().await;
        let send = server
            .mock("POST", path("sendMessage").as_str())
            .match_body(Matcher::Json(json!({
                "chat_id": "1003",
                "text": "See you then",
                "reply_parameters": {"message_id": 77, "allow_sending_without_reply": true}
            })))
            .with_body(r#"{"ok": true, "result": {"message_id": 78}}"#)
            .create_async()
            .await;
        let receipt = adapter(&server.url())
            .send(&SendTarget {
                message_id: Some("telegram:1003:77".into()),
                thread_id: "telegram:chat:1003".into(),
                body: "See you then".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        send.assert_async().await;
        assert_eq!(receipt.provider_message_id.as_deref(), Some("78"));
    }

    #[tokio::test]
    async fn send_without_chat_is_rejected() {
        let err = adapter("http://127.0.0.1:9")
            .send(&SendTarget {
                body: "hi".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.cause, ProviderErrorKind::InvalidTarget(_)));
    }
}
