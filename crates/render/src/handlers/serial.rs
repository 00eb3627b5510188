use std::io::Write;

use crate::{
    RenderError, RenderOptions, RenderRequest,
    handlers::Renderer,
    prepare::{Prepared, prepare},
};

/// Pretty JSON with two-space indentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    pub const NAME: &'static str = "json";
}

impl Renderer for Json {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_textual(&self) -> bool {
        false
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError> {
        match prepare(request, &options.style(), false) {
            Prepared::Message(message) => writeln!(out, "{message}")?,
            Prepared::Body { body, .. } => {
                let text = serde_json::to_string_pretty(body).map_err(|e| RenderError::Serialize {
                    format: Self::NAME,
                    reason: e.to_string(),
                })?;
                writeln!(out, "{text}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl Yaml {
    pub const NAME: &'static str = "yaml";
}

impl Renderer for Yaml {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_textual(&self) -> bool {
        false
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError> {
        match prepare(request, &options.style(), false) {
            Prepared::Message(message) => writeln!(out, "{message}")?,
            Prepared::Body { body, .. } => {
                let text = serde_yaml::to_string(body).map_err(|e| RenderError::Serialize {
                    format: Self::NAME,
                    reason: e.to_string(),
                })?;
                out.write_all(text.as_bytes())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(handler: &dyn Renderer, request: &RenderRequest) -> String {
        let mut out = Vec::new();
        handler.render(request, &RenderOptions::default(), &mut out).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn json_prints_the_untouched_document() {
        let data = json!({"entity": {"id": 42, "name": "x"}});
        let request = RenderRequest::new(data).key("entity").fields(["id"]);
        assert_eq!(
            render(&Json, &request),
            "{\n  \"entity\": {\n    \"id\": 42,\n    \"name\": \"x\"\n  }\n}\n"
        );
    }

    #[test]
    fn yaml_keeps_key_order() {
        let request = RenderRequest::new(json!({"b": 1, "a": [true]}));
        assert_eq!(render(&Yaml, &request), "b: 1\na:\n- true\n");
    }

    #[test]
    fn paging_envelope_is_not_a_header_here() {
        let request = RenderRequest::new(json!({"items": [], "page": 0, "count": 0, "total": 0, "sort": {}}));
        assert!(!render(&Json, &request).contains("Page:"));
    }
}
