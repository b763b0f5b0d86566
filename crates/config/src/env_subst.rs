/// Expand `${VAR}` and `${VAR:-fallback}` placeholders against the process
/// environment.
///
/// Unresolvable variables without a fallback are left as-is so the config
/// parser reports them verbatim.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an injected lookup.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        out.push_str(&expand(inner, &lookup));
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn expand(inner: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let (name, fallback) = match inner.split_once(":-") {
        Some((name, fallback)) => (name, Some(fallback)),
        None => (inner, None),
    };
    if name.is_empty() {
        return format!("${{{inner}}}");
    }
    // `:-` applies to unset and empty alike, as in POSIX shells.
    match (lookup(name).filter(|v| !v.is_empty()), fallback) {
        (Some(value), _) => value,
        (None, Some(fallback)) => fallback.to_string(),
        (None, None) => lookup(name).unwrap_or_else(|| format!("${{{inner}}}")),
    }
}
