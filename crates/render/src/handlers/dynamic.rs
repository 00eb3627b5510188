use std::io::Write;

use crate::{
    RenderError, RenderOptions, RenderRequest, fill_template,
    handlers::{Renderer, is_scalar, write_scalar},
    prepare::{Prepared, prepare, rows, write_paging_header},
};

/// One template line per row.
///
/// The request's `template` names a stored template or is itself the
/// template text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicTemplate;

impl DynamicTemplate {
    pub const NAME: &'static str = "dynamic-template";
}

impl Renderer for DynamicTemplate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError> {
        let (envelope, body) = match prepare(request, &options.style(), true) {
            Prepared::Message(message) => {
                writeln!(out, "{message}")?;
                return Ok(());
            }
            Prepared::Body { envelope, body } => (envelope, body),
        };
        let name = request.template.as_deref().ok_or(RenderError::MissingTemplate)?;
        let template = options.templates.get(name).unwrap_or(name);
        if let Some(envelope) = &envelope {
            write_paging_header(envelope, out)?;
        }
        if is_scalar(body) {
            return write_scalar(body, request, out);
        }
        let lines = rows(body, envelope.is_some() && request.key.is_none())
            .into_iter()
            .map(|row| {
                fill_template(template, row).map_err(|reason| RenderError::Template {
                    name: name.to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}", lines.join(request.separator.as_deref().unwrap_or("\n")))?;
        Ok(())
    }
}
