//! Workbook model and the document-store interface the template engine writes through.

mod io;
mod ops;
mod state;

pub use state::{Cell, Sheet, Workbook};

use crate::error::Result;
use tabula_engine::engine::{CellRef, MergeRange};

/// A multi-sheet grid of text cells with style ids and merge spans.
///
/// All coordinates are 1-based. Operations on an unknown sheet fail with
/// [`TabulaError::UnknownSheet`](crate::TabulaError::UnknownSheet).
pub trait DocumentStore {
    /// Sheet names in document order.
    fn sheet_names(&self) -> Vec<String>;

    /// Cell text by row, with trailing blank cells (and rows) trimmed.
    fn rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    fn cell_text(&self, sheet: &str, cell: CellRef) -> Result<String>;

    fn set_cell_text(&mut self, sheet: &str, cell: CellRef, text: &str) -> Result<()>;

    /// Style id of a cell; 0 is the default style.
    fn cell_style(&self, sheet: &str, cell: CellRef) -> Result<u32>;

    fn set_cell_style(&mut self, sheet: &str, cell: CellRef, style: u32) -> Result<()>;

    /// Insert an empty row at `row`, shifting it and everything below down by one.
    fn insert_row(&mut self, sheet: &str, row: usize) -> Result<()>;

    /// Delete `row`, shifting everything below up by one.
    fn remove_row(&mut self, sheet: &str, row: usize) -> Result<()>;

    fn merges(&self, sheet: &str) -> Result<Vec<MergeRange>>;

    /// Merge a range, replacing any existing merge it overlaps.
    fn merge(&mut self, sheet: &str, range: MergeRange) -> Result<()>;
}
