//! Splitting outgoing text to fit Telegram's message size limit.

/// Longest `sendMessage` text Telegram accepts, in bytes of UTF-8.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Split `text` into pieces of at most `max_len` bytes, preferring to break
/// at a newline, then at a space. Never splits inside a UTF-8 sequence.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > max_len {
        let mut window = rest.floor_char_boundary(max_len);
        if window == 0 {
            window = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let head = &rest[..window];
        let cut = match head.rfind('\n').or_else(|| head.rfind(' ')) {
            Some(0) | None => window,
            Some(idx) => idx,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
        rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix(' ')).unwrap_or(rest);
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
