//! # Text Processing Utilities
//!
//! Secret redaction for logs and curl traces, plus display-width aware
//! truncation for table cells.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const REDACTED: &str = "[REDACTED]";
const ELLIPSIS: &str = "...";

/// Key names whose values are always hidden in JSON payloads.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "pwd",
    "secret",
    "client_secret",
    "seckey",
    "access_token",
    "refresh_token",
    "token",
    "sign",
    "uid",
];

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(authorization:\s*)([^'\r\n]+)").expect("authorization pattern"),
        Regex::new(r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)").expect("bearer pattern"),
        Regex::new(r"(?i)((?:^|[\s'])(?:sign|uid):\s*)([^'\s]+)").expect("signing header pattern"),
        Regex::new(r#"(?i)("(?:password|pwd|client_secret|seckey|access_token|secret)"\s*:\s*")([^"]*)(")"#)
            .expect("json secret pattern"),
        Regex::new(r"(?i)((?:password|pwd|client_secret)=)([^&\s']+)").expect("form secret pattern"),
    ]
});

/// Redacts values that look like secrets in a string.
///
/// Header values (`Authorization`, `sign`, `uid`), bearer tokens and
/// password-like fields in JSON or form bodies are replaced with
/// `[REDACTED]`; the key names stay in place so traces remain readable.
///
/// # Example
/// ```rust
/// use beehive_util::text_processing::redact_sensitive;
///
/// let redacted = redact_sensitive("-H 'Authorization: Bearer abc.def'");
/// assert_eq!(redacted, "-H 'Authorization: [REDACTED]'");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}{REDACTED}{suffix}")
            })
            .to_string();
    }
    redacted
}

/// Returns a copy of `value` where every sensitive key holds `[REDACTED]`.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), redact_json(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|candidate| lowered == *candidate)
}

/// Truncate `text` so that its display width does not exceed `max_width`.
///
/// Truncated text ends with `...`, and the result (ellipsis included) fits in
/// `max_width` columns. Wide characters are never split. A `max_width` of zero
/// disables truncation.
pub fn truncate_display(text: &str, max_width: usize) -> String {
    if max_width == 0 || UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width <= ELLIPSIS.len() {
        return ELLIPSIS[..max_width].to_string();
    }
    let budget = max_width - ELLIPSIS.len();
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > budget {
            break;
        }
        used += width;
        out.push(ch);
    }
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_headers_in_curl_traces() {
        let trace = "curl -X GET -H 'uid: tok123' -H 'sign: abcdef' -H 'Authorization: Bearer tok' 'https://h/x'";
        let redacted = redact_sensitive(trace);
        assert!(!redacted.contains("tok123"));
        assert!(!redacted.contains("abcdef"));
        assert!(!redacted.contains("Bearer tok"));
        assert!(redacted.contains("'https://h/x'"));
    }

    #[test]
    fn redacts_passwords_in_bodies() {
        let body = r#"{"user":"admin","password":"s3cr3t"}"#;
        assert_eq!(redact_sensitive(body), r#"{"user":"admin","password":"[REDACTED]"}"#);
        assert_eq!(
            redact_sensitive("grant_type=client_credentials&client_secret=xyz"),
            "grant_type=client_credentials&client_secret=[REDACTED]"
        );
    }

    #[test]
    fn redacts_nested_json_keys() {
        let value = json!({"cmp": {"user": "u", "pwd": "p"}, "list": [{"token": "t"}]});
        let redacted = redact_json(&value);
        assert_eq!(redacted["cmp"]["user"], "u");
        assert_eq!(redacted["cmp"]["pwd"], REDACTED);
        assert_eq!(redacted["list"][0]["token"], REDACTED);
    }

    #[test]
    fn truncates_by_display_width() {
        assert_eq!(truncate_display("abcdef", 10), "abcdef");
        assert_eq!(truncate_display("abcdefghij", 6), "abc...");
        assert_eq!(truncate_display("日本語テキスト", 7), "日本...");
        assert_eq!(truncate_display("abcdef", 0), "abcdef");
        assert_eq!(truncate_display("abcdef", 2), "..");
    }
}
