//! Parser for the .grid workbook format
//!
//! ```text
//! # comment
//! [Sheet name]
//! A1: "Report" style=2
//! B1: 42
//! C1: style=5
//! merge A3:B3
//! ```
//!
//! Cell lines before the first `[...]` header belong to `Sheet1`.

use crate::document::{Sheet, Workbook};
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{CellRef, MergeRange};

const DEFAULT_SHEET: &str = "Sheet1";

/// Largest addressable row and column; larger references are parse errors.
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;

/// Parse .grid content from a string
pub fn parse_grid_content(content: &str) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let mut current: Option<Sheet> = None;

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(parse_error(line_num, "Expected ']' after sheet name"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(parse_error(line_num, "Empty sheet name"));
            }
            if workbook.sheet(name).is_some() || current.as_ref().is_some_and(|s| s.name == name) {
                return Err(parse_error(line_num, &format!("Duplicate sheet: {}", name)));
            }
            if let Some(sheet) = current.take() {
                workbook.push_sheet(sheet);
            }
            current = Some(Sheet::new(name));
            continue;
        }

        let sheet = current.get_or_insert_with(|| Sheet::new(DEFAULT_SHEET));

        if let Some(spec) = line.strip_prefix("merge ") {
            let range: MergeRange = spec
                .trim()
                .parse()
                .map_err(|e: String| parse_error(line_num, &e))?;
            check_bounds(range.end, line_num)?;
            sheet.merge(range);
            continue;
        }

        // Parse "CELLREF: VALUE" format
        let Some((cell_ref_str, value_str)) = line.split_once(':') else {
            return Err(parse_error(line_num, "Expected 'CELLREF: VALUE' format"));
        };

        let cell_ref_str = cell_ref_str.trim();
        let cell_ref = CellRef::parse_a1(cell_ref_str).ok_or_else(|| {
            parse_error(line_num, &format!("Invalid cell reference: {}", cell_ref_str))
        })?;
        check_bounds(cell_ref, line_num)?;

        let (text, style) = parse_cell_value(value_str.trim(), line_num)?;
        sheet.set_text(cell_ref, &text);
        sheet.set_style(cell_ref, style);
    }

    if let Some(sheet) = current {
        workbook.push_sheet(sheet);
    }
    Ok(workbook)
}

fn parse_error(line: usize, message: &str) -> TabulaError {
    TabulaError::Parse {
        line,
        message: message.to_string(),
    }
}

fn check_bounds(cell: CellRef, line_num: usize) -> Result<()> {
    if cell.row > MAX_ROWS || cell.col > MAX_COLS {
        return Err(parse_error(
            line_num,
            &format!(
                "Cell {} is out of range (max {} rows, {} columns)",
                cell, MAX_ROWS, MAX_COLS
            ),
        ));
    }
    Ok(())
}

/// Parse `"text" style=N`, `number style=N` or `style=N` (each part optional).
fn parse_cell_value(value: &str, line_num: usize) -> Result<(String, u32)> {
    let (text, rest) = if let Some(quoted) = value.strip_prefix('"') {
        let end = closing_quote(quoted)
            .ok_or_else(|| parse_error(line_num, "Unterminated quoted text"))?;
        (unescape_grid_text(&quoted[..end]), quoted[end + 1..].trim())
    } else {
        let (token, rest) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
        if token.is_empty() || token.starts_with("style=") {
            (String::new(), value)
        } else if token.parse::<f64>().is_ok() {
            (token.to_string(), rest.trim())
        } else {
            return Err(parse_error(
                line_num,
                &format!("Invalid value: {}. Use quotes for text.", token),
            ));
        }
    };

    let style = match rest {
        "" => 0,
        attr => attr
            .strip_prefix("style=")
            .and_then(|n| n.trim().parse::<u32>().ok())
            .ok_or_else(|| parse_error(line_num, &format!("Invalid attribute: {}", attr)))?,
    };
    Ok((text, style))
}

/// Byte index of the closing unescaped quote.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some(i);
        }
    }
    None
}

fn unescape_grid_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
