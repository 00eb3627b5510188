use std::io::Write;

use beehive_util::{Style, flatten_leaves};
use serde_json::Value;

use crate::{
    RenderError, RenderOptions, RenderRequest, cell_text,
    handlers::{Renderer, mixed::write_sections},
    prepare::{Prepared, prepare, write_paging_header},
    table::Grid,
};

pub const DETAILS_HEADERS: [&str; 2] = ["attrib", "value"];

/// Vertical `attrib`/`value` table of one object.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailsVertical;

impl DetailsVertical {
    pub const NAME: &'static str = "details-vertical";
}

/// Flatten `object` into `attrib`/`value` rows. Values are never truncated.
pub(crate) fn details_grid(object: &Value, request: &RenderRequest, options: &RenderOptions) -> Grid {
    let style = options.style();
    let rows = flatten_leaves(object)
        .into_iter()
        .filter(|(path, _)| {
            options.fields.is_empty()
                || options
                    .fields
                    .iter()
                    .any(|field| path == field || path.starts_with(&format!("{field}.")))
        })
        .enumerate()
        .map(|(index, (path, value))| {
            let text = match request.transforms.get(&path) {
                Some(transform) => transform(value, &style),
                None if index % 2 == 1 => style.paint(&cell_text(Some(value), &request.bool_map), Style::Yellow),
                None => cell_text(Some(value), &request.bool_map),
            };
            vec![path, text]
        })
        .collect();
    Grid {
        headers: DETAILS_HEADERS.iter().map(|header| style.header(header)).collect(),
        rows,
    }
}

impl Renderer for DetailsVertical {
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
        if let Some(envelope) = &envelope {
            write_paging_header(envelope, out)?;
        }
        let managed = request.manage_data.as_ref().map(|manage| manage(body));
        let head = managed.as_ref().map_or(body, |managed| &managed.head);
        let grid = details_grid(head, request, options);
        writeln!(out, "{}", grid.draw(request.table_style, request.show_headers, request.show_index))?;
        if let Some(managed) = &managed {
            write_sections(&managed.sections, request, options, out)?;
        }
        Ok(())
    }
}
