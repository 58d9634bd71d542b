//! Markdown export functionality

use crate::document::{Sheet, Workbook};
use crate::error::Result;
use std::fmt::Write as _;
use std::path::Path;
use tabula_engine::engine::CellRef;

/// Write every sheet of the workbook as a markdown table
pub fn write_markdown(path: &Path, workbook: &Workbook) -> Result<()> {
    std::fs::write(path, markdown_content(workbook))?;
    Ok(())
}

pub fn markdown_content(workbook: &Workbook) -> String {
    let mut out = String::new();
    for (i, sheet) in workbook.sheets().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_sheet(&mut out, sheet);
    }
    out
}

fn write_sheet(out: &mut String, sheet: &Sheet) {
    let _ = writeln!(out, "# {}", sheet.name);
    let _ = writeln!(out);

    let Some((max_row, max_col)) = sheet.bounds() else {
        let _ = writeln!(out, "*Empty sheet*");
        return;
    };

    // Header with column letters
    out.push_str("|   |");
    for col in 1..=max_col {
        let _ = write!(out, " {} |", CellRef::col_to_letters(col));
    }
    out.push('\n');

    out.push_str("|---|");
    for _ in 1..=max_col {
        out.push_str("---|");
    }
    out.push('\n');

    for row in 1..=max_row {
        let _ = write!(out, "| {} |", row);
        for col in 1..=max_col {
            let text = sheet.text(&CellRef::new(col, row));
            let _ = write!(out, " {} |", escape_markdown(&text));
        }
        out.push('\n');
    }
}

/// Escape special markdown characters in cell content
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_tables() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Report");
        sheet.set_text(CellRef::new(1, 1), "Name");
        sheet.set_text(CellRef::new(2, 2), "a|b");
        wb.add_sheet("Blank");

        let expected = "# Report\n\n\
|   | A | B |\n\
|---|---|---|\n\
| 1 | Name |  |\n\
| 2 |  | a\\|b |\n\
\n\
# Blank\n\n\
*Empty sheet*\n";
        assert_eq!(markdown_content(&wb), expected);
    }
}
