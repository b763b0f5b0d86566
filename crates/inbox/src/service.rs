//! The inbox: provider fan-out, local read state and user actions.
//!
//! Every provider and inference call goes through the [`Mediator`], so each
//! one shows up on the telemetry bus with a single calling entry and
//! exactly one terminal update.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    chatnest_assist::{AiAssist, AiStatus, Draft, DraftRequest, Summary},
    chatnest_channels::{
        LiveAdapterFactory, ModeGate, ProviderError, RawMessage, SendTarget, normalize,
    },
    chatnest_common::{Message, MessageScope, Platform, types::split_message_id},
    chatnest_config::{ChatnestConfig, validate::MAX_LIST_LIMIT},
    chatnest_telemetry::{Mediator, TelemetryBus},
    chrono::Utc,
    futures::future::join_all,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    factory::build_live_adapter,
    store::{MarkOutcome, MessageStore, sort_newest_first},
    types::{
        InboxStatus, PlatformStatus, RefreshReport, RefreshedPlatform, ReplyOutcome, ReplyRequest,
        SummarizeRequest, SummarizeThreadRequest, ThreadSummary,
    },
};

/// Messages folded into a thread summary when no limit is given.
pub const THREAD_SUMMARY_LIMIT: usize = 20;

/// Tool names recorded on telemetry entries.
pub mod tools {
    pub const FETCH: &str = "fetch_messages";
    pub const MARK_READ: &str = "mark_read";
    pub const SEND_REPLY: &str = "send_reply";
    pub const SUMMARIZE: &str = "summarize";
    pub const SUMMARIZE_THREAD: &str = "summarize_thread";
    pub const DRAFT_REPLY: &str = "draft_reply";
}

type Fetched = std::result::Result<Vec<Message>, ProviderError>;

pub struct InboxService {
    gate: RwLock<Arc<ModeGate>>,
    assist: RwLock<Arc<AiAssist>>,
    config: RwLock<Arc<ChatnestConfig>>,
    live: Arc<dyn LiveAdapterFactory>,
    store: MessageStore,
    mediator: Mediator,
}

fn current<T>(lock: &RwLock<Arc<T>>) -> Arc<T> {
    Arc::clone(&lock.read().unwrap_or_else(|e| e.into_inner()))
}

fn replace<T>(lock: &RwLock<Arc<T>>, value: T) {
    *lock.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(value);
}

/// `preferred` unless blank, else `fallback`.
fn pick(preferred: &str, fallback: Option<&str>) -> String {
    match preferred.trim() {
        "" => fallback.unwrap_or_default().trim().to_string(),
        p => p.to_string(),
    }
}

/// One `[time] sender: body` line per message, oldest first.
fn thread_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| !m.body.trim().is_empty())
        .map(|m| {
            let sender = if m.sender.is_empty() { "unknown" } else { m.sender.as_str() };
            format!(
                "[{}] {sender}: {}",
                m.timestamp.format("%Y-%m-%d %H:%M"),
                m.body.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl InboxService {
    /// Select adapters and the AI backend from `cfg`.
    pub fn from_config(cfg: &ChatnestConfig) -> Self {
        let live: Arc<dyn LiveAdapterFactory> = Arc::new(build_live_adapter);
        let gate = ModeGate::select(cfg, live.as_ref());
        Self::with_gate(cfg, gate, AiAssist::from_config(&cfg.ai)).with_live_factory(live)
    }

    /// Use a ready-made gate and assist; `cfg` supplies everything else.
    pub fn with_gate(cfg: &ChatnestConfig, gate: ModeGate, assist: AiAssist) -> Self {
        let bus = Arc::new(TelemetryBus::new(
            cfg.telemetry.capacity,
            cfg.telemetry.subscriber_buffer,
        ));
        let svc = Self {
            gate: RwLock::new(Arc::new(gate)),
            assist: RwLock::new(Arc::new(assist)),
            config: RwLock::new(Arc::new(cfg.clone())),
            live: Arc::new(build_live_adapter),
            store: MessageStore::new(),
            mediator: Mediator::new(bus),
        };
        svc.log_selection();
        svc
    }

    /// Factory consulted by [`InboxService::reconfigure`].
    #[must_use]
    pub fn with_live_factory(mut self, live: Arc<dyn LiveAdapterFactory>) -> Self {
        self.live = live;
        self
    }

    pub fn telemetry(&self) -> &Arc<TelemetryBus> {
        self.mediator.bus()
    }

    pub fn gate(&self) -> Arc<ModeGate> {
        current(&self.gate)
    }

    pub fn config(&self) -> Arc<ChatnestConfig> {
        current(&self.config)
    }

    fn assist(&self) -> Arc<AiAssist> {
        current(&self.assist)
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.config().inbox.fetch_timeout_secs.max(1))
    }

    fn resolve_limit(&self, limit: Option<usize>) -> Result<usize> {
        let limit = limit.unwrap_or(self.config().inbox.default_limit);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(Error::invalid(format!(
                "limit must be within 1..={MAX_LIST_LIMIT}, got {limit}"
            )));
        }
        Ok(limit)
    }

    fn log_selection(&self) {
        let gate = self.gate();
        for platform in Platform::ALL {
            match gate.mock_reason(platform) {
                Some(reason) => info!(%platform, %reason, "serving demo data"),
                None => info!(%platform, "connected"),
            }
        }
    }

    // ── Fetching ────────────────────────────────────────────────────────────

    /// Fetch `platforms` concurrently. Each fetch runs on its own task and
    /// is abandoned, not cancelled, once the fetch timeout passes.
    async fn fetch_platforms(&self, platforms: Vec<Platform>, limit: usize) -> Vec<(Platform, Fetched)> {
        let gate = self.gate();
        let timeout = self.fetch_timeout();
        let fetches = platforms.into_iter().map(|platform| {
            let adapter = gate.adapter(platform);
            async move {
                let call = async move {
                    let task = tokio::spawn(async move { adapter.fetch(limit).await });
                    match tokio::time::timeout(timeout, task).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(join)) => Err(ProviderError::transport(
                            platform,
                            format!("fetch task failed: {join}"),
                        )),
                        Err(_) => Err(ProviderError::timeout(platform, timeout)),
                    }
                };
                let fetched = self
                    .mediator
                    .invoke(tools::FETCH, Some(platform), call, |raw: &Vec<RawMessage>| {
                        format!("{} messages fetched", raw.len())
                    })
                    .await
                    .map(|raw| self.store.upsert(raw.iter().map(normalize).collect()));
                (platform, fetched)
            }
        });
        join_all(fetches).await
    }

    /// Fetch the providers in `scope` and merge what arrived in time,
    /// newest first. A failed provider contributes nothing.
    pub async fn list_messages(&self, scope: MessageScope, limit: Option<usize>) -> Result<Vec<Message>> {
        let limit = self.resolve_limit(limit)?;
        let mut merged: Vec<Message> = self
            .fetch_platforms(scope.platforms(), limit)
            .await
            .into_iter()
            .filter_map(|(_, fetched)| fetched.ok())
            .flatten()
            .collect();
        sort_newest_first(&mut merged);
        merged.truncate(limit);
        Ok(merged)
    }

    /// Everything fetched so far, without contacting any provider.
    pub fn cached_messages(&self, scope: MessageScope, limit: Option<usize>) -> Result<Vec<Message>> {
        let limit = self.resolve_limit(limit)?;
        Ok(self.store.list(scope, limit))
    }

    /// Fetch every provider once.
    pub async fn refresh(&self) -> RefreshReport {
        let gate = self.gate();
        let limit = self.config().inbox.default_limit.clamp(1, MAX_LIST_LIMIT);
        let platforms = self
            .fetch_platforms(Platform::ALL.to_vec(), limit)
            .await
            .into_iter()
            .map(|(platform, fetched)| {
                let demo_mode = !gate.connected(platform);
                let entry = match fetched {
                    Ok(messages) => RefreshedPlatform {
                        count: messages.len(),
                        demo_mode,
                        error: None,
                    },
                    Err(e) => RefreshedPlatform {
                        count: 0,
                        demo_mode,
                        error: Some(e.to_string()),
                    },
                };
                (platform, entry)
            })
            .collect();
        let unread = self.store.unread_counts();
        RefreshReport {
            platforms,
            total_unread: unread.values().sum(),
            unread,
        }
    }

    pub fn status(&self) -> InboxStatus {
        let gate = self.gate();
        let unread = self.store.unread_counts();
        let platforms = Platform::ALL
            .into_iter()
            .map(|platform| {
                (platform, PlatformStatus {
                    connected: gate.connected(platform),
                    unread: unread.get(&platform).copied().unwrap_or(0),
                    mock_reason: gate.mock_reason(platform).map(ToString::to_string),
                })
            })
            .collect();
        InboxStatus {
            demo_mode: gate.demo_mode(),
            platforms,
            total_unread: unread.values().sum(),
            server_time: Utc::now(),
        }
    }

    // ── Actions ─────────────────────────────────────────────────────────────

    /// Mark a stored message read, locally and on its provider. Returns
    /// whether the message was unread; repeating the call is a no-op.
    pub async fn mark_read(&self, message_id: &str) -> Result<bool> {
        let (platform, native) = split_message_id(message_id)?;
        let message = self
            .store
            .get(message_id)
            .ok_or_else(|| Error::not_found(format!("message {message_id}")))?;
        if !message.is_unread {
            debug!(message_id, "already read");
            return Ok(false);
        }
        let adapter = self.gate().adapter(platform);
        self.mediator
            .invoke(tools::MARK_READ, Some(platform), adapter.mark_read(native), |_| {
                format!("{message_id} marked read")
            })
            .await?;
        Ok(self.store.mark_read(message_id) == MarkOutcome::Marked)
    }

    /// Send a reply and mark the source message read.
    ///
    /// The body is drafted through AI assist when `use_ai_draft` is set or
    /// the body is blank, provided there is an original to draft from.
    pub async fn send_reply(&self, req: ReplyRequest) -> Result<ReplyOutcome> {
        let (platform, native) = split_message_id(&req.message_id)?;
        if let Some(requested) = req.platform
            && requested != platform
        {
            return Err(Error::invalid(format!(
                "message {} does not belong to {requested}",
                req.message_id
            )));
        }
        let source = self.store.get(&req.message_id);

        let mut body = req.body.trim().to_string();
        let mut ai_drafted = false;
        if req.use_ai_draft || body.is_empty() {
            let original = pick(&req.original_body, source.as_ref().map(|m| m.body.as_str()));
            if !original.is_empty() {
                let draft = self
                    .draft_reply(DraftRequest {
                        original_body: original,
                        platform: Some(platform),
                        sender: pick(&req.sender, source.as_ref().map(|m| m.sender.as_str())),
                        instructions: String::new(),
                    })
                    .await?;
                body = draft.draft;
                ai_drafted = true;
            }
        }
        if body.trim().is_empty() {
            return Err(Error::invalid("reply body is empty"));
        }

        let src = source.as_ref();
        let mut target = SendTarget {
            message_id: Some(req.message_id.clone()),
            thread_id: pick(&req.thread_id, src.map(|m| m.thread_id.as_str())),
            channel: pick(&req.channel, src.map(|m| m.channel.as_str())),
            chat_id: pick(&req.chat_id, src.and_then(|m| m.chat_id.as_deref())),
            recipient: pick(&req.recipient, src.map(|m| m.sender_email.as_str())),
            subject: pick(&req.subject, src.map(|m| m.subject.as_str())),
            body,
        };
        if platform == Platform::Slack
            && target.channel.is_empty()
            && target.chat_id.is_empty()
            && target.thread_id.is_empty()
        {
            target.channel = self.config().slack.default_channel.clone();
        }

        let gate = self.gate();
        let adapter = gate.adapter(platform);
        let receipt = self
            .mediator
            .invoke(tools::SEND_REPLY, Some(platform), adapter.send(&target), |_| {
                "reply sent".to_string()
            })
            .await?;

        // Local read state follows the send; the provider update is best effort.
        match self.store.mark_read(&req.message_id) {
            MarkOutcome::Marked => {
                if let Err(e) = self
                    .mediator
                    .invoke(tools::MARK_READ, Some(platform), adapter.mark_read(native), |_| {
                        format!("{} marked read", req.message_id)
                    })
                    .await
                {
                    warn!(message_id = %req.message_id, error = %e, "reply sent but provider mark-read failed");
                }
            },
            MarkOutcome::AlreadyRead => {},
            MarkOutcome::Unknown => {
                debug!(message_id = %req.message_id, "replied to a message not in the store");
            },
        }

        Ok(ReplyOutcome {
            sent: true,
            demo_mode: !gate.connected(platform),
            platform,
            body_sent: target.body,
            ai_drafted,
            provider_message_id: receipt.provider_message_id,
        })
    }

    pub async fn summarize(&self, req: SummarizeRequest) -> Result<Summary> {
        let id = req.message_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let id_platform = id.map(split_message_id).transpose()?.map(|(p, _)| p);
        let source = id.and_then(|id| self.store.get(id));

        let body = pick(&req.body, source.as_ref().map(|m| m.body.as_str()));
        let sender = pick(&req.sender, source.as_ref().map(|m| m.sender.as_str()));
        let platform = req.platform.or(id_platform);
        let assist = self.assist();
        let summary = self
            .mediator
            .invoke(
                tools::SUMMARIZE,
                platform,
                assist.summarize(&body, platform, &sender),
                |s| format!("summary via {}", s.model_name),
            )
            .await?;
        Ok(summary)
    }

    /// Summarize the latest stored messages of a thread or chat together.
    /// The thread must have been fetched at least once.
    pub async fn summarize_thread(&self, req: SummarizeThreadRequest) -> Result<ThreadSummary> {
        let thread_id = req.thread_id.trim();
        if thread_id.is_empty() {
            return Err(Error::invalid("thread_id is required"));
        }
        let limit = req.limit.unwrap_or(THREAD_SUMMARY_LIMIT);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(Error::invalid(format!(
                "limit must be within 1..={MAX_LIST_LIMIT}, got {limit}"
            )));
        }
        let messages = self.store.thread(thread_id, limit);
        let Some(first) = messages.first() else {
            return Err(Error::not_found(format!("thread {thread_id}")));
        };
        let platform = first.platform;
        let transcript = thread_transcript(&messages);
        let assist = self.assist();
        let summary = self
            .mediator
            .invoke(
                tools::SUMMARIZE_THREAD,
                Some(platform),
                assist.summarize(&transcript, Some(platform), ""),
                |s| format!("{} messages summarized via {}", messages.len(), s.model_name),
            )
            .await?;
        Ok(ThreadSummary {
            thread_id: thread_id.to_string(),
            platform,
            message_count: messages.len(),
            summary: summary.summary,
            model_name: summary.model_name,
            used_primary: summary.used_primary,
        })
    }

    pub async fn draft_reply(&self, req: DraftRequest) -> Result<Draft> {
        let assist = self.assist();
        let draft = self
            .mediator
            .invoke(tools::DRAFT_REPLY, req.platform, assist.draft_reply(&req), |d| {
                format!("draft via {}", d.model_name)
            })
            .await?;
        Ok(draft)
    }

    pub async fn ai_status(&self) -> AiStatus {
        self.assist().status().await
    }

    /// Re-run adapter and AI backend selection for a changed config.
    /// Stored messages and the telemetry window are kept.
    pub fn reconfigure(&self, cfg: &ChatnestConfig) {
        let previous = self.gate();
        replace(
            &self.gate,
            ModeGate::reselect(Some(&previous), cfg, self.live.as_ref()),
        );
        replace(&self.assist, AiAssist::from_config(&cfg.ai));
        replace(&self.config, cfg.clone());
        self.log_selection();
    }
}
