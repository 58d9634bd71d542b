//! Writes rendered rows back into a sheet.
//!
//! Every rendered row is inserted as a new row at
//! `max(barrier, current position of its template row)`. The barrier only
//! moves down, so a row can never land above one inserted before it, and
//! tracked template-row positions are shifted as rows go in above them.
//! Template rows are deleted afterwards, followed by rows that hold nothing
//! but control markers.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::ast::{RowTemplate, SheetTemplate};
use super::markers::{has_placeholder, is_control_marker};
use super::render::RenderRow;
use crate::document::DocumentStore;
use crate::error::Result;
use tabula_engine::engine::{CellRef, MergeRange};

/// Apply `rows` (in render order) to the template's sheet in `store`.
pub fn materialize<S: DocumentStore + ?Sized>(
    store: &mut S,
    template: &SheetTemplate,
    rows: &[RenderRow],
) -> Result<()> {
    let sheet = template.name.as_str();
    let Some((min_row, _)) = template.span else {
        return Ok(());
    };

    let mut positions: BTreeMap<usize, usize> =
        template.row_templates.keys().map(|&row| (row, row)).collect();
    let mut barrier = min_row;
    let blank = RowTemplate::default();

    for rendered in rows {
        let Some(&position) = positions.get(&rendered.source_row) else {
            continue;
        };
        let row_template = template
            .row_templates
            .get(&rendered.source_row)
            .unwrap_or(&blank);

        let at = barrier.max(position);
        store.insert_row(sheet, at)?;
        write_row(store, sheet, at, row_template, rendered)?;
        trace!(sheet, source_row = rendered.source_row, at, "inserted row");

        barrier = at + 1;
        for pos in positions.values_mut() {
            if *pos >= at {
                *pos += 1;
            }
        }
    }

    let mut stale: Vec<usize> = positions.into_values().collect();
    stale.sort_unstable_by(|a, b| b.cmp(a));
    stale.dedup();
    for row in &stale {
        store.remove_row(sheet, *row)?;
    }

    let removed = remove_control_rows(store, sheet)?;
    debug!(
        sheet,
        inserted = rows.len(),
        template_rows = stale.len(),
        marker_rows = removed,
        "materialized sheet"
    );
    Ok(())
}

fn write_row<S: DocumentStore + ?Sized>(
    store: &mut S,
    sheet: &str,
    at: usize,
    template: &RowTemplate,
    rendered: &RenderRow,
) -> Result<()> {
    for (&col, &style) in &template.styles {
        store.set_cell_style(sheet, CellRef::new(col, at), style)?;
    }
    for (&col, raw) in &template.statics {
        let text = if has_placeholder(raw) { "" } else { raw.as_str() };
        store.set_cell_text(sheet, CellRef::new(col, at), text)?;
    }
    for (&col, value) in &rendered.values {
        store.set_cell_text(sheet, CellRef::new(col, at), value)?;
    }
    for &(start, end) in &template.merges {
        store.merge(
            sheet,
            MergeRange::new(CellRef::new(start, at), CellRef::new(end, at)),
        )?;
    }
    Ok(())
}

/// Delete rows whose non-blank cells are all control markers. Returns the
/// number of rows removed.
pub fn remove_control_rows<S: DocumentStore + ?Sized>(store: &mut S, sheet: &str) -> Result<usize> {
    let rows = store.rows(sheet)?;
    let marker_rows: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| {
            let mut filled = cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).peekable();
            filled.peek().is_some() && filled.all(is_control_marker)
        })
        .map(|(idx, _)| idx + 1)
        .collect();

    for row in marker_rows.iter().rev() {
        store.remove_row(sheet, *row)?;
    }
    Ok(marker_rows.len())
}
