use std::{io::Write, sync::Arc};

use beehive_util::{MISSING, StyleEngine};
use serde_json::Value;

use crate::{
    RenderError, RenderOptions, RenderRequest, Section, Transform,
    columns::resolve_columns,
    handlers::{Renderer, details::details_grid, is_scalar, tabulate, write_scalar},
    prepare::{Prepared, prepare, rows, write_paging_header},
};

/// Fields coloured by state unless the request brings its own transform.
pub const STATE_FIELDS: [&str; 3] = ["state", "base_state", "status"];

/// Head table followed by underlined sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mixed;

impl Mixed {
    pub const NAME: &'static str = "mixed";
}

fn state_transform() -> Transform {
    Arc::new(|value: &Value, style: &StyleEngine| match value {
        Value::String(state) => style.color_error(state),
        Value::Null => MISSING.to_string(),
        other => other.to_string(),
    })
}

/// Print each section under its underlined title.
pub(crate) fn write_sections(
    sections: &[Section],
    request: &RenderRequest,
    options: &RenderOptions,
    out: &mut dyn Write,
) -> Result<(), RenderError> {
    let style = options.style();
    // `--fields`/`--afields` only shape the head.
    let section_options = RenderOptions {
        fields: Vec::new(),
        afields: Vec::new(),
        ..options.clone()
    };
    for section in sections {
        writeln!(out)?;
        writeln!(out, "{}", style.title(&section.title))?;
        let rows = rows(&section.rows, false);
        let columns = resolve_columns(&section.headers, &section.fields, &section_options, &rows);
        if columns.is_empty() {
            continue;
        }
        let grid = tabulate(&rows, &columns, request, &section_options, false);
        writeln!(out, "{}", grid.draw(request.table_style, request.show_headers, false))?;
    }
    Ok(())
}

impl Renderer for Mixed {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut request = request.clone();
        for field in STATE_FIELDS {
            request.transforms.entry(field.to_string()).or_insert_with(state_transform);
        }
        let (envelope, body) = match prepare(&request, &options.style(), true) {
            Prepared::Message(message) => {
                writeln!(out, "{message}")?;
                return Ok(());
            }
            Prepared::Body { envelope, body } => (envelope, body),
        };
        if let Some(envelope) = &envelope {
            write_paging_header(envelope, out)?;
        }
        if is_scalar(body) {
            return write_scalar(body, &request, out);
        }

        let managed = request.manage_data.as_ref().map(|manage| manage(body));
        let head = managed.as_ref().map_or(body, |managed| &managed.head);
        let grid = if request.details {
            details_grid(head, &request, options)
        } else {
            let rows = rows(head, envelope.is_some() && request.key.is_none());
            let columns = resolve_columns(&request.headers, &request.fields, options, &rows);
            tabulate(&rows, &columns, &request, options, false)
        };
        if !grid.headers.is_empty() {
            writeln!(out, "{}", grid.draw(request.table_style, request.show_headers, request.show_index))?;
        }
        if let Some(managed) = &managed {
            write_sections(&managed.sections, &request, options, out)?;
        }
        Ok(())
    }
}
