use comfy_table::{Cell, ContentArrangement, Table, presets};

use crate::TableStyle;

/// Cells ready for drawing; ANSI styling is already applied.
#[derive(Debug, Default)]
pub(crate) struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn draw(&self, style: TableStyle, show_headers: bool, show_index: bool) -> String {
        let mut table = Table::new();
        table.load_preset(preset(style));
        table.set_content_arrangement(ContentArrangement::Disabled);
        if show_headers {
            let mut header: Vec<Cell> = Vec::with_capacity(self.headers.len() + 1);
            if show_index {
                header.push(Cell::new("#"));
            }
            header.extend(self.headers.iter().map(Cell::new));
            table.set_header(header);
        }
        for (index, row) in self.rows.iter().enumerate() {
            let mut cells: Vec<Cell> = Vec::with_capacity(row.len() + 1);
            if show_index {
                cells.push(Cell::new(index));
            }
            cells.extend(row.iter().map(Cell::new));
            table.add_row(cells);
        }
        table.to_string()
    }
}

fn preset(style: TableStyle) -> &'static str {
    match style {
        TableStyle::Simple => presets::ASCII_HORIZONTAL_ONLY,
        TableStyle::Plain => presets::NOTHING,
        TableStyle::Grid => presets::ASCII_FULL,
        TableStyle::Fancy => presets::UTF8_FULL,
        TableStyle::Markdown => presets::ASCII_MARKDOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_headers_and_index() {
        let grid = Grid {
            headers: vec!["id".into(), "name".into()],
            rows: vec![vec!["1".into(), "alpha".into()], vec!["2".into(), "beta".into()]],
        };
        let drawn = grid.draw(TableStyle::Grid, true, true);
        let lines: Vec<&str> = drawn.lines().collect();
        assert!(lines.iter().any(|line| line.contains('#') && line.contains("name")));
        assert!(lines.iter().any(|line| line.contains("0") && line.contains("alpha")));

        let bare = grid.draw(TableStyle::Plain, false, false);
        assert!(!bare.contains("name"));
        assert!(bare.contains("beta"));
    }
}
