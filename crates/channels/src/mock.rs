//! Deterministic demo adapter.
//!
//! Produces provider-shaped JSON so demo data travels the same
//! normalization path as live data. The dataset is a pure function of
//! platform, size and anchor time: refetching yields identical messages.

use std::sync::atomic::{AtomicU64, Ordering};

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD},
    chatnest_common::Platform,
    chrono::{DateTime, Duration, Utc},
    rand::{Rng, SeedableRng, rngs::StdRng},
    serde_json::{Value, json},
    tracing::info,
};

use crate::{
    adapter::{AdapterMode, ProviderAdapter, RawMessage, SendReceipt, SendTarget},
    error::Result,
};

const SEED: u64 = 0x00C0_FFEE_1DEA;

pub struct MockAdapter {
    platform: Platform,
    size: usize,
    anchor: DateTime<Utc>,
    sent: AtomicU64,
}

impl MockAdapter {
    /// Messages per platform in the default dataset.
    pub const DEFAULT_SIZE: usize = 5;

    pub fn new(platform: Platform) -> Self {
        Self::with_size(platform, Self::DEFAULT_SIZE)
    }

    pub fn with_size(platform: Platform, size: usize) -> Self {
        Self::with_anchor(platform, size, Utc::now())
    }

    /// Pin the "now" that message ages are measured back from.
    pub fn with_anchor(platform: Platform, size: usize, anchor: DateTime<Utc>) -> Self {
        Self {
            platform,
            size,
            anchor,
            sent: AtomicU64::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The full dataset, newest first.
    pub fn dataset(&self) -> Vec<RawMessage> {
        let mut rng = StdRng::seed_from_u64(SEED ^ (self.platform as u64 + 1));
        let mut minutes_back = 0i64;
        (0..self.size)
            .map(|i| {
                minutes_back += if i == 0 {
                    rng.random_range(2..=6)
                } else {
                    rng.random_range(20..=240)
                };
                let at = self.anchor - Duration::minutes(minutes_back);
                // First pass over the fixtures keeps their hand-picked read
                // state; later cycles draw it.
                let unread = |fixture_unread: bool, rng: &mut StdRng| {
                    if i < FIXTURE_COUNT {
                        fixture_unread
                    } else {
                        rng.random_bool(0.6)
                    }
                };
                let payload = match self.platform {
                    Platform::Gmail => {
                        let f = &GMAIL[i % FIXTURE_COUNT];
                        gmail_payload(i, f, at, unread(f.unread, &mut rng))
                    },
                    Platform::Slack => {
                        let f = &SLACK[i % FIXTURE_COUNT];
                        slack_payload(i, f, at, unread(f.unread, &mut rng))
                    },
                    Platform::Telegram => {
                        let f = &TELEGRAM[i % FIXTURE_COUNT];
                        telegram_payload(i, f, at, unread(f.unread, &mut rng))
                    },
                };
                RawMessage::new(self.platform, payload)
            })
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn mode(&self) -> AdapterMode {
        AdapterMode::Mock
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawMessage>> {
        let mut data = self.dataset();
        data.truncate(limit);
        Ok(data)
    }

    async fn send(&self, target: &SendTarget) -> Result<SendReceipt> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let to = [&target.recipient, &target.channel, &target.chat_id]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or("unknown recipient", String::as_str);
        info!(platform = %self.platform, to, "demo send simulated");
        Ok(SendReceipt {
            provider_message_id: Some(format!("mock-sent-{n}")),
        })
    }
}

// ── Payload builders ────────────────────────────────────────────────────────

fn native_id(i: usize) -> String {
    format!("mock{:03}", i + 1)
}

fn gmail_payload(i: usize, f: &GmailFixture, at: DateTime<Utc>, unread: bool) -> Value {
    let id = native_id(i);
    let mut labels = vec!["INBOX"];
    if unread {
        labels.push("UNREAD");
    }
    let from = format!("{} <{}>", f.name, f.email);
    json!({
        "id": id,
        "threadId": format!("thread_{id}"),
        "labelIds": labels,
        "internalDate": at.timestamp_millis().to_string(),
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": from},
                {"name": "To", "value": "me@chatnest.test"},
                {"name": "Subject", "value": f.subject},
            ],
            "body": {"data": URL_SAFE_NO_PAD.encode(f.body)},
        },
    })
}

fn slack_payload(i: usize, f: &SlackFixture, at: DateTime<Utc>, unread: bool) -> Value {
    let ts = format!("{}.{:06}", at.timestamp(), 100 + i);
    let mut payload = json!({
        "type": "message",
        "ts": ts,
        "text": f.text,
        "user": format!("U{:07}", 1000 + i),
        "user_name": f.user,
        "channel_name": f.channel,
        "channel_id": format!("C{:07}", 500 + i % FIXTURE_COUNT),
        "is_unread": unread,
    });
    if f.threaded {
        payload["thread_ts"] = Value::from(ts);
        payload["reply_count"] = Value::from(2);
    }
    payload
}

fn telegram_payload(i: usize, f: &TelegramFixture, at: DateTime<Utc>, unread: bool) -> Value {
    let chat = match f.group {
        Some(title) => json!({"id": f.chat_id, "type": "group", "title": title}),
        None => json!({"id": f.chat_id, "type": "private", "first_name": f.first_name}),
    };
    json!({
        "message_id": 100 + i,
        "date": at.timestamp(),
        "chat": chat,
        "from": {
            "id": 9000 + i,
            "is_bot": false,
            "first_name": f.first_name,
            "last_name": f.last_name,
            "username": f.username,
        },
        "text": f.text,
        "is_unread": unread,
    })
}

// ── Fixtures ────────────────────────────────────────────────────────────────

const FIXTURE_COUNT: usize = 5;

struct GmailFixture {
    name: &'static str,
    email: &'static str,
    subject: &'static str,
    body: &'static str,
    unread: bool,
}

struct SlackFixture {
    user: &'static str,
    channel: &'static str,
    text: &'static str,
    threaded: bool,
    unread: bool,
}

struct TelegramFixture {
    chat_id: i64,
    group: Option<&'static str>,
    first_name: &'static str,
    last_name: &'static str,
    username: &'static str,
    text: &'static str,
    unread: bool,
}

const GMAIL: [GmailFixture; FIXTURE_COUNT] = [
    GmailFixture {
        name: "Dana Whitfield",
        email: "dana.whitfield@northwind.test",
        subject: "Contract renewal: signature needed by Thursday",
        body: "Hi,\n\nThe renewal draft for the Northwind support contract is attached. \
               Legal approved clauses 1 through 7 but asked us to confirm the revised \
               response-time targets in clause 8. Could you review and sign before \
               Thursday so procurement can file it this quarter?\n\nThanks,\nDana",
        unread: true,
    },
    GmailFixture {
        name: "Build Bot",
        email: "ci@builds.example.test",
        subject: "[chatnest] Nightly build #311 failed",
        body: "Nightly build #311 failed at step `integration-tests`.\n\n\
               2 tests failed, 148 passed.\n\nLogs: https://builds.example.test/311",
        unread: true,
    },
    GmailFixture {
        name: "Leo Marchetti",
        email: "leo@studio-marchetti.test",
        subject: "Re: Landing page copy",
        body: "The new headline reads much better. I tightened the second paragraph \
               and swapped the hero image for the darker variant. Let me know if the \
               call-to-action wording works for you.\n\nLeo",
        unread: true,
    },
    GmailFixture {
        name: "Billing",
        email: "billing@cloudhost.test",
        subject: "Your October receipt",
        body: "Payment of $29.00 for the Team plan was received. No action is needed.",
        unread: false,
    },
    GmailFixture {
        name: "Ines Duarte",
        email: "ines.duarte@lab.test",
        subject: "",
        body: "Lunch on Friday?",
        unread: true,
    },
];

const SLACK: [SlackFixture; FIXTURE_COUNT] = [
    SlackFixture {
        user: "Priya",
        channel: "dev",
        text: "Standup moved to 10:15 today. Please update your tickets before joining.",
        threaded: false,
        unread: true,
    },
    SlackFixture {
        user: "Tom Becker",
        channel: "general",
        text: "Reminder that the office is closed on Monday for maintenance. If you \
               need hardware picked up, drop a note in this thread by Friday noon and \
               facilities will sort it out before the long weekend starts.",
        threaded: true,
        unread: true,
    },
    SlackFixture {
        user: "alertbot",
        channel: "alerts",
        text: "CPU above 90% on api-2 for 5 minutes.",
        threaded: false,
        unread: false,
    },
    SlackFixture {
        user: "Mina Cho",
        channel: "design",
        text: "Uploaded the new icon set, feedback welcome.",
        threaded: false,
        unread: true,
    },
    SlackFixture {
        user: "deploybot",
        channel: "deploys",
        text: "v2.4.1 rolled out to production.",
        threaded: true,
        unread: false,
    },
];

const TELEGRAM: [TelegramFixture; FIXTURE_COUNT] = [
    TelegramFixture {
        chat_id: 1003,
        group: None,
        first_name: "Rafael",
        last_name: "Souza",
        username: "rsouza",
        text: "Are you free for a call tomorrow morning? I have feedback on the prototype.",
        unread: true,
    },
    TelegramFixture {
        chat_id: -3001,
        group: Some("Hiking Club"),
        first_name: "Ana",
        last_name: "",
        username: "ana_trails",
        text: "Saturday's route is up: 14 km, meet at the north trailhead at 8.",
        unread: true,
    },
    TelegramFixture {
        chat_id: 1007,
        group: None,
        first_name: "Yuki",
        last_name: "Tanaka",
        username: "",
        text: "Sent you the slides.",
        unread: true,
    },
    TelegramFixture {
        chat_id: -3002,
        group: Some("Release Crew"),
        first_name: "Sam",
        last_name: "Okafor",
        username: "samo",
        text: "Changelog for 2.4 is merged.",
        unread: false,
    },
    TelegramFixture {
        chat_id: 1011,
        group: None,
        first_name: "",
        last_name: "",
        username: "kbrandt",
        text: "Thanks for the quick fix yesterday, the export works again and the team \
               is happy. If you ever need a tester for the next release, count me in.",
        unread: false,
    },
];
