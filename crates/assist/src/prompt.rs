//! Prompt text sent to inference backends.

use chatnest_common::Platform;

pub const SUMMARIZE_SYSTEM: &str = "You are a concise communication assistant. \
    Summarize messages clearly in 2-4 sentences. \
    Highlight: main topic, action items, and suggested next steps. \
    Be direct and avoid filler.";

pub const DRAFT_SYSTEM: &str = "You are a professional communication assistant. \
    Draft a short, polite reply to the message below. \
    Keep it under 3 sentences unless more detail is clearly needed. \
    Match the tone of the original message.";

fn context(platform: Option<Platform>, sender: &str, instructions: &str) -> String {
    let mut ctx = String::new();
    if let Some(p) = platform {
        ctx.push_str(&format!("Platform: {}\n", p.display_name()));
    }
    if !sender.trim().is_empty() {
        ctx.push_str(&format!("From: {}\n", sender.trim()));
    }
    if !instructions.trim().is_empty() {
        ctx.push_str(&format!("Instructions: {}\n", instructions.trim()));
    }
    ctx
}

pub fn summarize(body: &str, platform: Option<Platform>, sender: &str) -> String {
    format!(
        "{}\nMessage:\n{body}\n\nProvide a concise summary.",
        context(platform, sender, "")
    )
}

pub fn draft(
    original_body: &str,
    platform: Option<Platform>,
    sender: &str,
    instructions: &str,
) -> String {
    format!(
        "{}\nOriginal message:\n{original_body}\n\nDraft a professional reply.",
        context(platform, sender, instructions)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_prompt_carries_context() {
        let p = summarize("Budget is due.", Some(Platform::Gmail), "Sarah <s@acme.test>");
        assert_eq!(
            p,
            "Platform: Gmail\nFrom: Sarah <s@acme.test>\n\nMessage:\nBudget is due.\n\nProvide a concise summary."
        );
    }

    #[test]
    fn draft_prompt_omits_blank_context() {
        let p = draft("Lunch?", None, " ", "");
        assert_eq!(p, "\nOriginal message:\nLunch?\n\nDraft a professional reply.");

        let p = draft("Lunch?", Some(Platform::Slack), "omar", "decline politely");
        assert!(p.starts_with("Platform: Slack\nFrom: omar\nInstructions: decline politely\n"));
    }
}
