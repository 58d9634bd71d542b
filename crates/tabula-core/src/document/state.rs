use dashmap::DashMap;

use super::DocumentStore;
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{CellRef, MergeRange};

/// A single cell: display text plus a style id (0 = default).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub style: u32,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.style == 0
    }
}

/// One sheet: a sparse grid plus merge ranges.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub grid: DashMap<CellRef, Cell>,
    pub merges: Vec<MergeRange>,
}

impl Sheet {
    pub fn new(name: &str) -> Sheet {
        Sheet {
            name: name.to_string(),
            grid: DashMap::new(),
            merges: Vec::new(),
        }
    }

    pub fn text(&self, cell: &CellRef) -> String {
        self.grid.get(cell).map(|c| c.text.clone()).unwrap_or_default()
    }

    pub fn style(&self, cell: &CellRef) -> u32 {
        self.grid.get(cell).map_or(0, |c| c.style)
    }

    pub fn set_text(&self, cell: CellRef, text: &str) {
        self.update(cell, |c| c.text = text.to_string());
    }

    pub fn set_style(&self, cell: CellRef, style: u32) {
        self.update(cell, |c| c.style = style);
    }

    fn update(&self, cell: CellRef, apply: impl FnOnce(&mut Cell)) {
        let mut entry = self.grid.get(&cell).map(|c| c.clone()).unwrap_or_default();
        apply(&mut entry);
        if entry.is_blank() {
            self.grid.remove(&cell);
        } else {
            self.grid.insert(cell, entry);
        }
    }

    /// Highest used row and column, or None for an empty sheet.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        let mut max_row = 0usize;
        let mut max_col = 0usize;
        for entry in self.grid.iter() {
            max_row = max_row.max(entry.key().row);
            max_col = max_col.max(entry.key().col);
        }
        for range in &self.merges {
            max_row = max_row.max(range.end.row);
            max_col = max_col.max(range.end.col);
        }
        (max_row > 0).then_some((max_row, max_col))
    }

    /// Cell text by row with trailing blanks trimmed.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let Some((max_row, _)) = self.bounds() else {
            return Vec::new();
        };
        let mut rows = vec![Vec::<String>::new(); max_row];
        for entry in self.grid.iter() {
            if entry.value().text.is_empty() {
                continue;
            }
            let CellRef { row, col } = *entry.key();
            let cells = &mut rows[row - 1];
            if cells.len() < col {
                cells.resize(col, String::new());
            }
            cells[col - 1] = entry.value().text.clone();
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

/// An ordered collection of sheets.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Workbook {
        Workbook::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Return the named sheet, appending an empty one if missing.
    pub fn add_sheet(&mut self, name: &str) -> &mut Sheet {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }

    pub fn push_sheet(&mut self, sheet: Sheet) {
        match self.sheet_mut(&sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Result<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| TabulaError::UnknownSheet(name.to_string()))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheet_mut(name)
            .ok_or_else(|| TabulaError::UnknownSheet(name.to_string()))
    }
}

impl DocumentStore for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.get(sheet)?.rows())
    }

    fn cell_text(&self, sheet: &str, cell: CellRef) -> Result<String> {
        Ok(self.get(sheet)?.text(&cell))
    }

    fn set_cell_text(&mut self, sheet: &str, cell: CellRef, text: &str) -> Result<()> {
        self.get(sheet)?.set_text(cell, text);
        Ok(())
    }

    fn cell_style(&self, sheet: &str, cell: CellRef) -> Result<u32> {
        Ok(self.get(sheet)?.style(&cell))
    }

    fn set_cell_style(&mut self, sheet: &str, cell: CellRef, style: u32) -> Result<()> {
        self.get(sheet)?.set_style(cell, style);
        Ok(())
    }

    fn insert_row(&mut self, sheet: &str, row: usize) -> Result<()> {
        self.get_mut(sheet)?.insert_row(row);
        Ok(())
    }

    fn remove_row(&mut self, sheet: &str, row: usize) -> Result<()> {
        self.get_mut(sheet)?.remove_row(row);
        Ok(())
    }

    fn merges(&self, sheet: &str) -> Result<Vec<MergeRange>> {
        Ok(self.get(sheet)?.merges.clone())
    }

    fn merge(&mut self, sheet: &str, range: MergeRange) -> Result<()> {
        self.get_mut(sheet)?.merge(range);
        Ok(())
    }
}
