//! Minimal RFC 822 composition for plain-text replies.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE},
};

/// Prefix `Re: ` unless the subject already carries it.
pub fn reply_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        subject.to_string()
    } else if subject.is_empty() {
        "Re: (no subject)".to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// RFC 2047 encoded-word for header values that are not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

/// Compose a plain-text reply and return it base64url-encoded, ready for
/// the `raw` field of `users.messages.send`.
pub fn compose_reply(to: &str, subject: &str, body: &str) -> String {
    // Header injection guard: a recipient never spans lines.
    let to: String = to.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    let subject: String = reply_subject(subject)
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    let body = body.replace("\r\n", "\n").replace('\n', "\r\n");
    let message = format!(
        "To: {to}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{body}",
        encode_header(&subject),
    );
    URL_SAFE.encode(message)
}
