//! Provider-native payloads to the canonical [`Message`].
//!
//! Normalization never fails. Missing optional fields become empty strings,
//! unparseable timestamps fall back to the normalization time, and fields
//! with no canonical slot land in `extensions` or are dropped.

use {
    base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD},
    chatnest_common::{Message, Platform},
    chrono::{DateTime, Utc},
    serde_json::{Map, Value},
};

use crate::adapter::RawMessage;

/// Preview budget, in Unicode scalar values after whitespace collapsing.
pub const PREVIEW_CHARS: usize = 140;

/// Collapse whitespace and cut `text` to [`PREVIEW_CHARS`], appending `...`
/// only when something was cut.
pub fn make_preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &collapsed[..idx]),
        None => collapsed,
    }
}

/// Normalize using the current time as the timestamp fallback.
pub fn normalize(raw: &RawMessage) -> Message {
    normalize_at(raw, Utc::now())
}

pub fn normalize_at(raw: &RawMessage, now: DateTime<Utc>) -> Message {
    let p = &raw.payload;
    match raw.platform {
        Platform::Gmail => gmail(p, now),
        Platform::Slack => slack(p, now),
        Platform::Telegram => telegram(p, now),
    }
}

// ── Gmail (users.messages resource, format=full) ────────────────────────────

fn gmail(p: &Value, now: DateTime<Utc>) -> Message {
    let native = non_empty(str_at(p, "id")).map_or_else(anonymous_id, str::to_string);
    let part = p.get("payload").unwrap_or(&Value::Null);
    let header = |name: &str| gmail_header(part, name).unwrap_or_default();

    let (sender, sender_email) = parse_sender(header("From"));
    let body = extract_plain(part)
        .or_else(|| decode_part_body(part))
        .unwrap_or_else(|| str_at(p, "snippet").to_string());
    let preview = match non_empty(str_at(p, "snippet")) {
        Some(snippet) => make_preview(snippet),
        None => make_preview(&body),
    };

    let timestamp = str_at(p, "internalDate")
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .or_else(|| {
            DateTime::parse_from_rfc2822(header("Date").trim())
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
        .unwrap_or(now);

    let labels: Vec<&str> = p
        .get("labelIds")
        .and_then(Value::as_array)
        .map(|ls| ls.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut extensions = Map::new();
    if !labels.is_empty() {
        extensions.insert("label_ids".into(), Value::from(labels.clone()));
    }

    Message {
        id: Platform::Gmail.qualify(&native),
        platform: Platform::Gmail,
        sender,
        sender_email,
        subject: header("Subject").trim().to_string(),
        channel: String::new(),
        preview,
        body,
        timestamp,
        is_unread: labels.contains(&"UNREAD"),
        thread_id: str_at(p, "threadId").to_string(),
        chat_id: None,
        extensions,
    }
}

fn gmail_header<'a>(part: &'a Value, name: &str) -> Option<&'a str> {
    part.get("headers")?
        .as_array()?
        .iter()
        .find(|h| str_at(h, "name").eq_ignore_ascii_case(name))
        .map(|h| str_at(h, "value"))
}

/// Split a `From:` header into display name and address.
fn parse_sender(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if let Some((name, rest)) = raw.split_once('<') {
        if let Some((addr, _)) = rest.split_once('>') {
            let addr = addr.trim();
            let name = name.trim().trim_matches('"').trim();
            let display = if name.is_empty() { addr } else { name };
            return (display.to_string(), addr.to_string());
        }
    }
    if raw.contains('@') {
        (raw.to_string(), raw.to_string())
    } else {
        (raw.to_string(), String::new())
    }
}

/// Depth-first search for the first non-empty `text/plain` part.
fn extract_plain(part: &Value) -> Option<String> {
    if str_at(part, "mimeType") == "text/plain" {
        if let Some(text) = decode_part_body(part) {
            return Some(text);
        }
    }
    part.get("parts")?
        .as_array()?
        .iter()
        .find_map(extract_plain)
}

fn decode_part_body(part: &Value) -> Option<String> {
    let data = non_empty(part.get("body").map_or("", |b| str_at(b, "data")))?;
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    non_empty(&String::from_utf8_lossy(&bytes)).map(str::to_string)
}

// ── Slack (conversations.history message + channel/user enrichment) ─────────

fn slack(p: &Value, now: DateTime<Utc>) -> Message {
    let ts = str_at(p, "ts");
    let ts_key = non_empty(ts).map_or_else(anonymous_id, str::to_string);
    let channel_name = str_at(p, "channel_name").trim_start_matches('#');
    let channel_key = non_empty(channel_name).unwrap_or_else(|| str_at(p, "channel_id"));
    let thread_ts = non_empty(str_at(p, "thread_ts")).unwrap_or(ts_key.as_str());

    let sender = [
        str_at(p, "user_name"),
        str_at(p, "username"),
        str_at(p, "user"),
        str_at(p, "bot_id"),
    ]
    .into_iter()
    .find_map(non_empty)
    .unwrap_or("Bot")
    .to_string();

    let body = str_at(p, "text").trim().to_string();

    let mut extensions = Map::new();
    extensions.insert("ts".into(), Value::from(ts_key.clone()));
    for key in ["bot_id", "reply_count", "subtype"] {
        if let Some(v) = p.get(key) {
            extensions.insert(key.into(), v.clone());
        }
    }

    Message {
        id: Platform::Slack.qualify(&format!("{channel_key}:{ts_key}")),
        platform: Platform::Slack,
        sender,
        sender_email: String::new(),
        subject: String::new(),
        channel: if channel_key.is_empty() {
            String::new()
        } else {
            format!("#{channel_key}")
        },
        preview: make_preview(&body),
        body,
        timestamp: parse_slack_ts(ts).unwrap_or(now),
        is_unread: unread_hint(p),
        thread_id: format!("slack:thread:{channel_key}:{thread_ts}"),
        chat_id: non_empty(str_at(p, "channel_id")).map(str::to_string),
        extensions,
    }
}

/// `"1705744800.000100"` → seconds + microseconds.
fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs = secs.parse::<i64>().ok()?;
    let micros = frac.get(..frac.len().min(6))?.parse::<u32>().ok()?;
    let scale = 10u32.pow(6 - frac.len().min(6) as u32);
    DateTime::from_timestamp(secs, micros * scale * 1_000)
}

// ── Telegram (Bot API Message object) ───────────────────────────────────────

fn telegram(p: &Value, now: DateTime<Utc>) -> Message {
    let chat = p.get("chat").unwrap_or(&Value::Null);
    let from = p.get("from").unwrap_or(&Value::Null);
    let chat_id = scalar_at(chat, "id");
    let message_id = non_empty(&scalar_at(p, "message_id"))
        .map_or_else(anonymous_id, str::to_string);

    let person = {
        let full = format!("{} {}", str_at(from, "first_name"), str_at(from, "last_name"));
        let full = full.trim();
        if !full.is_empty() {
            full.to_string()
        } else if let Some(username) = non_empty(str_at(from, "username")) {
            username.to_string()
        } else {
            non_empty(&scalar_at(from, "id")).unwrap_or("Unknown").to_string()
        }
    };

    let text = non_empty(str_at(p, "text"))
        .or_else(|| non_empty(str_at(p, "caption")))
        .unwrap_or_default();

    let chat_type = non_empty(str_at(chat, "type")).unwrap_or("private");
    let private = chat_type == "private";
    let (channel, sender, body) = if private {
        ("DM".to_string(), person, text.to_string())
    } else {
        let title = non_empty(str_at(chat, "title"))
            .map_or_else(|| format!("Group {chat_id}"), str::to_string);
        (title.clone(), title, format!("{person}: {text}"))
    };

    let mut extensions = Map::new();
    extensions.insert("chat_type".into(), Value::from(chat_type));

    Message {
        id: Platform::Telegram.qualify(&format!("{chat_id}:{message_id}")),
        platform: Platform::Telegram,
        sender,
        sender_email: non_empty(str_at(from, "username"))
            .map(|u| format!("@{u}"))
            .unwrap_or_default(),
        subject: String::new(),
        channel,
        preview: make_preview(&body),
        body,
        timestamp: p
            .get("date")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(now),
        is_unread: unread_hint(p),
        thread_id: format!("telegram:chat:{chat_id}"),
        chat_id: non_empty(&chat_id).map(str::to_string),
        extensions,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Slack and Telegram bots see no per-message read state, so everything is
/// unread unless the payload carries an explicit `is_unread` flag (the demo
/// dataset does).
fn unread_hint(p: &Value) -> bool {
    p.get("is_unread").and_then(Value::as_bool).unwrap_or(true)
}

fn str_at<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// String or number field rendered as text (Telegram ids are integers).
fn scalar_at(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn anonymous_id() -> String {
    format!("anon-{}", uuid::Uuid::new_v4().simple())
}
