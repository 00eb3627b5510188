//! The seven output handlers.

mod details;
mod dynamic;
mod mixed;
mod serial;
mod tabular;

use std::io::Write;

use beehive_util::Style;
use serde_json::Value;

pub use details::DetailsVertical;
pub use dynamic::DynamicTemplate;
pub use mixed::Mixed;
pub use serial::{Json, Yaml};
pub use tabular::Tabular;

use crate::{
    RenderError, RenderOptions, RenderRequest,
    columns::{Column, column_text},
    table::Grid,
};

/// One output format.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Textual handlers print paging headers and may use colour.
    fn is_textual(&self) -> bool {
        true
    }

    fn render(&self, request: &RenderRequest, options: &RenderOptions, out: &mut dyn Write) -> Result<(), RenderError>;
}

/// Build the cells of `rows`; with `stripe`, odd rows without a transform
/// are painted yellow.
pub(crate) fn tabulate(
    rows: &[&Value],
    columns: &[Column],
    request: &RenderRequest,
    options: &RenderOptions,
    stripe: bool,
) -> Grid {
    let style = options.style();
    let headers = columns.iter().map(|column| style.header(&column.header)).collect();
    let rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            columns
                .iter()
                .map(|column| {
                    let (text, transformed) = column_text(row, column, request, options, true);
                    if stripe && !transformed && index % 2 == 1 {
                        style.paint(&text, Style::Yellow)
                    } else {
                        text
                    }
                })
                .collect()
        })
        .collect();
    Grid { headers, rows }
}

/// Print a bare scalar body.
pub(crate) fn write_scalar(body: &Value, request: &RenderRequest, out: &mut dyn Write) -> Result<(), RenderError> {
    writeln!(out, "{}", crate::cell_text(Some(body), &request.bool_map))?;
    Ok(())
}

pub(crate) fn is_scalar(body: &Value) -> bool {
    !matches!(body, Value::Null | Value::Array(_) | Value::Object(_))
}

/// Same options with colour forced to `color`.
pub(crate) fn with_color(options: &RenderOptions, color: bool) -> RenderOptions {
    RenderOptions {
        color,
        ..options.clone()
    }
}
