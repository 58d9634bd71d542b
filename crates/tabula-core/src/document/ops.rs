use super::{Cell, Sheet};
use tabula_engine::engine::{CellRef, MergeRange};

impl Sheet {
    /// Insert an empty row at `at`, shifting cells and merges at or below it down.
    /// A merge that spans `at` from above grows by one row.
    pub fn insert_row(&mut self, at: usize) {
        // Collect all cells at row >= at
        let cells_to_move: Vec<(CellRef, Cell)> = self
            .grid
            .iter()
            .filter(|entry| entry.key().row >= at)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (cell_ref, _) in &cells_to_move {
            self.grid.remove(cell_ref);
        }

        // Reinsert moved cells one row down
        for (cell_ref, cell) in cells_to_move {
            self.grid.insert(CellRef::new(cell_ref.col, cell_ref.row + 1), cell);
        }

        for range in &mut self.merges {
            if range.start.row >= at {
                range.start.row += 1;
            }
            if range.end.row >= at {
                range.end.row += 1;
            }
        }
    }

    /// Delete row `at`, shifting everything below it up.
    /// Merges lying wholly on the row are dropped; taller merges shrink.
    pub fn remove_row(&mut self, at: usize) {
        let cells_at: Vec<CellRef> = self
            .grid
            .iter()
            .filter(|entry| entry.key().row == at)
            .map(|entry| *entry.key())
            .collect();

        for cell_ref in cells_at {
            self.grid.remove(&cell_ref);
        }

        let cells_to_move: Vec<(CellRef, Cell)> = self
            .grid
            .iter()
            .filter(|entry| entry.key().row > at)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (cell_ref, _) in &cells_to_move {
            self.grid.remove(cell_ref);
        }

        for (cell_ref, cell) in cells_to_move {
            self.grid.insert(CellRef::new(cell_ref.col, cell_ref.row - 1), cell);
        }

        self.merges.retain(|range| !range.is_within_row(at));
        for range in &mut self.merges {
            if range.start.row > at {
                range.start.row -= 1;
            }
            if range.end.row >= at && range.end.row > range.start.row {
                range.end.row -= 1;
            }
        }
        self.merges.retain(|range| range.start != range.end);
    }

    /// Add a merge, dropping any existing merge it overlaps. Single-cell
    /// ranges are ignored.
    pub fn merge(&mut self, range: MergeRange) {
        if range.start == range.end {
            return;
        }
        self.merges.retain(|existing| !overlaps(existing, &range));
        self.merges.push(range);
    }
}

fn overlaps(a: &MergeRange, b: &MergeRange) -> bool {
    a.start.col <= b.end.col
        && b.start.col <= a.end.col
        && a.start.row <= b.end.row
        && b.start.row <= a.end.row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellRef {
        a1.parse().unwrap()
    }

    fn range(s: &str) -> MergeRange {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_row_shifts_cells_and_merges() {
        let mut sheet = Sheet::new("S");
        sheet.set_text(cell("A1"), "top");
        sheet.set_text(cell("A2"), "moved");
        sheet.set_style(cell("B2"), 3);
        sheet.merge(range("A2:B2"));
        sheet.merge(range("D1:D3"));

        sheet.insert_row(2);

        assert_eq!(sheet.text(&cell("A1")), "top");
        assert_eq!(sheet.text(&cell("A2")), "");
        assert_eq!(sheet.text(&cell("A3")), "moved");
        assert_eq!(sheet.style(&cell("B3")), 3);
        assert_eq!(sheet.merges, vec![range("A3:B3"), range("D1:D4")]);
    }

    #[test]
    fn test_remove_row_shifts_up_and_drops_row_merges() {
        let mut sheet = Sheet::new("S");
        sheet.set_text(cell("A1"), "keep");
        sheet.set_text(cell("A2"), "gone");
        sheet.set_text(cell("A3"), "up");
        sheet.merge(range("A2:C2"));
        sheet.merge(range("A4:B4"));
        sheet.merge(range("E1:E3"));

        sheet.remove_row(2);

        assert_eq!(sheet.text(&cell("A1")), "keep");
        assert_eq!(sheet.text(&cell("A2")), "up");
        assert_eq!(sheet.text(&cell("A3")), "");
        assert_eq!(sheet.merges, vec![range("A3:B3"), range("E1:E2")]);
    }

    #[test]
    fn test_merge_replaces_overlapping() {
        let mut sheet = Sheet::new("S");
        sheet.merge(range("A1:B1"));
        sheet.merge(range("B1:C1"));
        sheet.merge(range("A1:A1"));
        assert_eq!(sheet.merges, vec![range("B1:C1")]);
    }
}
