use super::Workbook;
use crate::error::{Result, TabulaError};
use crate::storage::{parse_csv_content, parse_grid_content, write_csv, write_grid, write_markdown};
use std::path::Path;

const MAX_WORKBOOK_BYTES: u64 = 64 * 1_048_576; // 64 MiB

/// Name given to the single sheet of an imported CSV file.
const CSV_SHEET_NAME: &str = "Sheet1";

fn read_workbook_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_WORKBOOK_BYTES {
        return Err(TabulaError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_WORKBOOK_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl Workbook {
    /// Load a workbook, choosing the format from the file extension.
    pub fn open(path: &Path) -> Result<Workbook> {
        match extension(path).as_str() {
            "grid" => parse_grid_content(&read_workbook_file(path)?),
            "csv" => {
                let sheet = parse_csv_content(&read_workbook_file(path)?, CSV_SHEET_NAME)?;
                let mut workbook = Workbook::new();
                workbook.push_sheet(sheet);
                Ok(workbook)
            }
            other => Err(TabulaError::UnsupportedFormat(format!(
                "cannot open '.{}' files ({})",
                other,
                path.display()
            ))),
        }
    }

    /// Save the workbook, choosing the format from the file extension.
    ///
    /// CSV holds a single sheet: `sheet` when given, otherwise the first one.
    pub fn save(&self, path: &Path, sheet: Option<&str>) -> Result<()> {
        match extension(path).as_str() {
            "grid" => write_grid(path, self),
            "md" => write_markdown(path, self),
            "csv" => {
                let target = match sheet {
                    Some(name) => self.get(name)?,
                    None => self
                        .sheets()
                        .first()
                        .ok_or_else(|| TabulaError::UnknownSheet("<none>".to_string()))?,
                };
                write_csv(path, target)
            }
            other => Err(TabulaError::UnsupportedFormat(format!(
                "cannot save '.{}' files ({})",
                other,
                path.display()
            ))),
        }
    }
}
