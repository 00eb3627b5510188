//! `curl` reproductions of outgoing requests.

use beehive_util::redact_sensitive;

/// Tracing target for curl lines; the binary always lets `info` through for it.
pub const CURL_TARGET: &str = "beehive::curl";

/// When requests are traced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceSettings {
    /// Trace every request.
    pub curl: bool,
    /// Trace failing requests even when `curl` is off.
    pub curl_error: bool,
}

/// Render an equivalent, redacted `curl` command line.
pub fn curl_command(method: &str, url: &str, headers: &[(String, String)], body: Option<&str>) -> String {
    let mut parts = vec![format!("curl -X {method}")];
    for (name, value) in headers {
        parts.push(format!("-H {}", quote(&format!("{name}: {value}"))));
    }
    if let Some(body) = body.filter(|body| !body.is_empty()) {
        parts.push(format!("-d {}", quote(body)));
    }
    parts.push(quote(url));
    redact_sensitive(&parts.join(" "))
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
