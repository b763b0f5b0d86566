//! Deterministic local stand-ins for the inference backend.

use chatnest_common::Platform;

/// Most leading sentences an extractive summary keeps.
pub const SUMMARY_SENTENCES: usize = 3;

/// Character budget for an extractive summary.
pub const SUMMARY_CHARS: usize = 280;

/// Longest quote of the original message in a template draft.
const TOPIC_CHARS: usize = 110;

const DEFAULT_NEXT_STEP: &str = "I will review this and get back to you shortly.";

/// Leading sentences of `body` (at most three) within [`SUMMARY_CHARS`].
/// `None` when the body has no text.
pub fn extractive_summary(body: &str) -> Option<String> {
    let text = collapse(body);
    if text.is_empty() {
        return None;
    }
    let mut summary = String::new();
    for sentence in sentences(&text).into_iter().take(SUMMARY_SENTENCES) {
        if !summary.is_empty() {
            if summary.chars().count() + 1 + sentence.chars().count() > SUMMARY_CHARS {
                break;
            }
            summary.push(' ');
        }
        summary.push_str(sentence);
    }
    Some(truncate(&summary, SUMMARY_CHARS))
}

/// Fixed reply skeleton filled with the sender's first name, a quote of the
/// original and the caller's instructions. Email gets a greeting block and
/// sign-off; chat platforms get a single line. `None` when the original has
/// no text.
pub fn template_draft(
    original_body: &str,
    platform: Option<Platform>,
    sender: &str,
    instructions: &str,
) -> Option<String> {
    let topic = collapse(original_body);
    if topic.is_empty() {
        return None;
    }
    let greeting = match first_name(sender) {
        Some(name) => format!("Hi {name},"),
        None => "Hi,".to_string(),
    };
    let ack = format!(
        "Thanks for your message about \"{}\".",
        truncate(&topic, TOPIC_CHARS)
    );
    let next_step = match instructions.trim() {
        "" => DEFAULT_NEXT_STEP,
        given => given,
    };
    Some(match platform {
        Some(Platform::Slack | Platform::Telegram) => format!("{greeting} {ack} {next_step}"),
        Some(Platform::Gmail) | None => format!("{greeting}\n\n{ack} {next_step}\n\nBest,"),
    })
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split at `.`, `!` or `?` followed by whitespace or the end of text.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let at_break = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if matches!(c, '.' | '!' | '?') && at_break {
            let end = idx + c.len_utf8();
            out.push(text[start..end].trim());
            start = end;
        }
    }
    out.push(text[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// `"Sarah Chen <sarah@acme.test>"` → `Sarah`, `sarah@acme.test` → `sarah`,
/// `@rsouza` → `rsouza`.
fn first_name(sender: &str) -> Option<String> {
    let display = sender.split('<').next().unwrap_or_default().trim();
    let display = if display.is_empty() {
        sender.trim().trim_start_matches('<').trim_end_matches('>')
    } else {
        display
    };
    let local = display.trim_start_matches('@');
    let local = local.split('@').next().unwrap_or_default();
    let name = local.split_whitespace().next()?.trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}
