//! Pre-processing shared by every handler.

use std::io::Write;

use beehive_types::PagingEnvelope;
use beehive_util::{StyleEngine, multi_get};
use serde_json::Value;

use crate::{RenderError, RenderRequest};

static NULL: Value = Value::Null;

pub(crate) enum Prepared<'a> {
    /// A `msg` with a transform: print it and stop.
    Message(String),
    Body {
        envelope: Option<PagingEnvelope>,
        body: &'a Value,
    },
}

/// Apply the `msg` shortcut, then descend into `key`.
///
/// `descend` is off for serializing handlers, which print the untouched data.
pub(crate) fn prepare<'a>(request: &'a RenderRequest, style: &StyleEngine, descend: bool) -> Prepared<'a> {
    if let Some(message) = request.data.get("msg")
        && let Some(transform) = request.transforms.get("msg")
    {
        return Prepared::Message(transform(message, style));
    }
    let envelope = PagingEnvelope::from_value(&request.data);
    let body = match (&request.key, descend) {
        (Some(key), true) => multi_get(&request.data, key).unwrap_or(&NULL),
        _ => &request.data,
    };
    Prepared::Body { envelope, body }
}

/// The four paging lines plus a blank separator line.
pub(crate) fn write_paging_header(envelope: &PagingEnvelope, out: &mut dyn Write) -> Result<(), RenderError> {
    for line in envelope.header_lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Rows of a textual render.
///
/// Arrays are rows; a paged object without a `key` contributes its first
/// array; any other object is a single row.
pub(crate) fn rows<'a>(body: &'a Value, paged: bool) -> Vec<&'a Value> {
    match body {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) if paged => map
            .values()
            .find_map(|value| value.as_array())
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_shortcut_needs_a_transform() {
        let style = StyleEngine::disabled();
        let plain = RenderRequest::new(json!({"msg": "done"}));
        assert!(matches!(prepare(&plain, &style, true), Prepared::Body { .. }));
        let message = RenderRequest::message("done");
        assert!(matches!(prepare(&message, &style, true), Prepared::Message(text) if text == "done"));
    }

    #[test]
    fn key_descends_and_envelope_comes_from_the_top() {
        let request = RenderRequest::new(json!({
            "items": [{"id": 1}], "page": 0, "count": 1, "total": 1, "sort": {"field": "id", "order": "DESC"}
        }))
        .key("items");
        let Prepared::Body { envelope, body } = prepare(&request, &StyleEngine::disabled(), true) else {
            panic!("expected a body");
        };
        assert_eq!(envelope.map(|e| e.total), Some(1));
        assert_eq!(body, &json!([{"id": 1}]));
    }

    #[test]
    fn paged_objects_yield_their_first_array() {
        let body = json!({"page": 0, "items": [{"id": 1}, {"id": 2}]});
        assert_eq!(rows(&body, true).len(), 2);
        assert_eq!(rows(&body, false).len(), 1);
        assert!(rows(&Value::Null, false).is_empty());
    }
}
