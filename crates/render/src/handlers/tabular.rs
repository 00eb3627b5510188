use std::io::Write;

use crate::{
    RenderError, RenderOptions, RenderRequest,
    columns::resolve_columns,
    handlers::{Renderer, is_scalar, tabulate, with_color, write_scalar},
    prepare::{Prepared, prepare, rows, write_paging_header},
};

/// Horizontal table, plain or with header accents and striped rows.
#[derive(Debug, Clone, Copy)]
pub struct Tabular {
    colored: bool,
}

impl Tabular {
    pub const PLAIN: &'static str = "tabular";
    pub const COLORED: &'static str = "tabular-color";

    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn colored() -> Self {
        Self { colored: true }
    }
}

impl Renderer for Tabular {
    fn name(&self) -> &'static str {
        if self.colored { Self::COLORED } else { Self::PLAIN }
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError> {
        let options = with_color(options, self.colored && options.color);
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
        if is_scalar(body) {
            return write_scalar(body, request, out);
        }
        let rows = rows(body, envelope.is_some() && request.key.is_none());
        let columns = resolve_columns(&request.headers, &request.fields, &options, &rows);
        if columns.is_empty() {
            return Ok(());
        }
        let grid = tabulate(&rows, &columns, request, &options, self.colored);
        writeln!(out, "{}", grid.draw(request.table_style, request.show_headers, request.show_index))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(handler: Tabular, request: &RenderRequest, color: bool) -> String {
        let mut out = Vec::new();
        let options = RenderOptions {
            color,
            ..RenderOptions::default()
        };
        handler.render(request, &options, &mut out).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    fn paged() -> serde_json::Value {
        json!({
            "items": [{"id": 1}, {"id": 2}, {"id": 3}],
            "page": 0, "count": 3, "total": 3,
            "sort": {"field": "id", "order": "DESC"}
        })
    }

    #[test]
    fn paging_header_precedes_the_table() {
        let output = render(Tabular::plain(), &RenderRequest::new(paged()), false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(&lines[..5], &["Page: 0", "Count: 3", "Total: 3", "Order: id DESC", ""]);
        assert!(output.contains('3'));
    }

    #[test]
    fn colored_rows_alternate_with_yellow() {
        let output = render(Tabular::colored(), &RenderRequest::new(paged()).key("items"), true);
        assert!(output.contains("\u{1b}[33m2\u{1b}[39m"));
        assert!(!output.contains("\u{1b}[33m1\u{1b}[39m"));
        assert!(!output.contains("\u{1b}[33m3\u{1b}[39m"));
        assert!(output.contains("\u{1b}[34m"));
    }

    #[test]
    fn plain_tables_never_emit_escapes() {
        let output = render(Tabular::plain(), &RenderRequest::new(paged()), true);
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn transforms_override_row_colour() {
        let request = RenderRequest::new(json!([{"state": "x"}, {"state": "active"}]))
            .fields(["state"])
            .transform("state", |value, style| style.color_error(value.as_str().unwrap_or_default()));
        let output = render(Tabular::colored(), &request, true);
        assert!(output.contains("\u{1b}[32mactive\u{1b}[39m"));
        assert!(!output.contains("\u{1b}[33m"));
    }

    #[test]
    fn scalars_print_as_a_line() {
        let output = render(Tabular::plain(), &RenderRequest::new(json!("pong")), false);
        assert_eq!(output, "pong\n");
    }
}
