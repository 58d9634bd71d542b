//! CSV import/export of a single sheet

use crate::document::Sheet;
use crate::error::{Result, TabulaError};
use std::io::Write;
use std::path::Path;
use tabula_engine::engine::CellRef;

/// Parse CSV content into a sheet named `name`.
pub fn parse_csv_content(content: &str, name: &str) -> Result<Sheet> {
    if content.trim().is_empty() {
        return Err(TabulaError::EmptyCsv);
    }
    let sheet = Sheet::new(name);
    for (row_idx, line) in content.lines().enumerate() {
        for (col_idx, field) in parse_csv_line(line).into_iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            sheet.set_text(CellRef::new(col_idx + 1, row_idx + 1), &field);
        }
    }
    Ok(sheet)
}

/// Parse a single CSV line, handling quoted fields
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    fields.push(finish_field(std::mem::take(&mut current), field_was_quoted));
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    fields.push(finish_field(current, field_was_quoted));
    fields
}

fn finish_field(field: String, quoted: bool) -> String {
    if quoted {
        field
    } else {
        field.trim().to_string()
    }
}

/// Export a sheet's cell text to CSV, from A1 to the sheet's bounds.
pub fn write_csv(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(csv_content(sheet).as_bytes())?;
    Ok(())
}

pub fn csv_content(sheet: &Sheet) -> String {
    let Some((max_row, max_col)) = sheet.bounds() else {
        return String::new();
    };
    let mut out = String::new();
    for row in 1..=max_row {
        let fields: Vec<String> = (1..=max_col)
            .map(|col| escape_csv_field(&sheet.text(&CellRef::new(col, row))))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Escape a field for CSV output
fn escape_csv_field(field: &str) -> String {
    // Guard against CSV formula injection in spreadsheet apps.
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}
