//! Writer for the .grid workbook format

use crate::document::Workbook;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Write a workbook to a .grid file
pub fn write_grid(path: &Path, workbook: &Workbook) -> Result<()> {
    fs::write(path, write_grid_content(workbook))?;
    Ok(())
}

/// Write a workbook to a .grid format string
pub fn write_grid_content(workbook: &Workbook) -> String {
    let mut lines = vec!["# Tabula workbook".to_string()];

    for sheet in workbook.sheets() {
        lines.push(String::new());
        lines.push(format!("[{}]", sheet.name));

        // Collect and sort cells by position for consistent output
        let mut cells: Vec<_> = sheet
            .grid
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        cells.sort_by(|(a, _), (b, _)| a.row.cmp(&b.row).then(a.col.cmp(&b.col)));

        for (cell_ref, cell) in cells {
            let line = match (cell.text.is_empty(), cell.style) {
                (true, 0) => continue,
                (true, style) => format!("{}: style={}", cell_ref, style),
                (false, 0) => format!("{}: \"{}\"", cell_ref, escape_grid_text(&cell.text)),
                (false, style) => format!(
                    "{}: \"{}\" style={}",
                    cell_ref,
                    escape_grid_text(&cell.text),
                    style
                ),
            };
            lines.push(line);
        }

        for range in &sheet.merges {
            lines.push(format!("merge {}", range));
        }
    }

    lines.join("\n") + "\n"
}

fn escape_grid_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::parse_grid_content;
    use tabula_engine::engine::CellRef;

    #[test]
    fn test_write_sorted_with_styles_and_merges() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Data");
        sheet.set_text(CellRef::new(2, 2), "b2");
        sheet.set_text(CellRef::new(1, 1), "a1");
        sheet.set_style(CellRef::new(1, 1), 4);
        sheet.set_style(CellRef::new(3, 1), 1);
        sheet.merge("A3:B3".parse().unwrap());

        let content = write_grid_content(&wb);
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# Tabula workbook",
                "",
                "[Data]",
                "A1: \"a1\" style=4",
                "C1: style=1",
                "B2: \"b2\"",
                "merge A3:B3",
            ]
        );
    }

    #[test]
    fn test_escaped_text_reads_back() {
        let mut wb = Workbook::new();
        wb.add_sheet("S")
            .set_text(CellRef::new(1, 1), "line1\nsaid \"x\" \\ tab\t");
        let parsed = parse_grid_content(&write_grid_content(&wb)).unwrap();
        assert_eq!(
            parsed.sheet("S").unwrap().text(&CellRef::new(1, 1)),
            "line1\nsaid \"x\" \\ tab\t"
        );
    }
}
