//! Spreadsheet templates: directive parsing, rendering against JSON data and
//! writing the result back into the document.
//!
//! - [`parse_sheet`] - Sheet rows to a [`SheetTemplate`]
//! - [`render_sheet`] - Template plus data to ordered [`RenderRow`]s
//! - [`materialize`] - Rendered rows back into the sheet
//! - [`Template`] - All of the above for every sheet of a document

mod ast;
mod data;
mod markers;
mod materialize;
mod options;
mod parser;
mod render;

pub use ast::{CellTemplate, Node, RowTemplate, SheetTemplate, Token};
pub use data::{parse_documents, unwrap_fenced};
pub use markers::{Marker, is_control_marker, parse_marker};
pub use materialize::{materialize, remove_control_rows};
pub use options::TemplateOptions;
pub use parser::{parse_sheet, tokenize};
pub use render::{RenderRow, render_sheet};

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::document::{DocumentStore, Workbook};
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{CellRef, EvalContext, Evaluator, Value};

/// A parsed template for every sheet of a document.
pub struct Template {
    sheets: Vec<SheetTemplate>,
    evaluator: Evaluator,
}

impl Template {
    /// Parse every sheet of `store`, in document order.
    pub fn parse<S: DocumentStore + ?Sized>(store: &S, options: &TemplateOptions) -> Result<Template> {
        let sheets = store
            .sheet_names()
            .iter()
            .map(|name| parse_sheet(store, name, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Template {
            sheets,
            evaluator: Evaluator::new(),
        })
    }

    pub fn sheets(&self) -> &[SheetTemplate] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetTemplate> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Compile every condition (`{{#if}}` headers and `iif` conditions)
    /// without evaluating anything.
    pub fn validate_conditions(&self) -> Result<()> {
        for sheet in &self.sheets {
            for node in sheet.iter_nodes() {
                match node {
                    Node::If { row, condition, .. } => {
                        self.evaluator.check_condition(condition).map_err(|source| {
                            TabulaError::Render {
                                sheet: sheet.name.clone(),
                                row: *row,
                                source,
                            }
                        })?;
                    }
                    Node::Row { row, cells } => {
                        for cell in cells {
                            let conditions = cell.tokens.iter().flat_map(|t| match t {
                                Token::Expr { expr, .. } => expr.conditions(),
                                Token::Text(_) => Vec::new(),
                            });
                            for condition in conditions {
                                self.evaluator.check_condition(condition).map_err(|source| {
                                    TabulaError::Expression {
                                        sheet: sheet.name.clone(),
                                        cell: CellRef::new(cell.col, *row).to_string(),
                                        source,
                                    }
                                })?;
                            }
                        }
                    }
                    Node::Each { .. } | Node::EachObj { .. } => {}
                }
            }
        }
        Ok(())
    }

    /// Render against raw data documents (JSON, optionally fenced).
    pub fn render<S, D>(&self, store: &mut S, documents: &[D]) -> Result<()>
    where
        S: DocumentStore + Clone,
        D: AsRef<str>,
    {
        let roots = parse_documents(documents);
        if roots.is_empty() {
            warn!(
                supplied = documents.len(),
                "no usable data documents; every data path will be empty"
            );
        }
        self.render_roots(store, roots)
    }

    /// Render against already parsed root documents.
    ///
    /// Every sheet is rendered before any is written, and the writes go to
    /// a copy of `store` that replaces it only once every sheet succeeded.
    pub fn render_roots<S>(&self, store: &mut S, roots: Vec<Value>) -> Result<()>
    where
        S: DocumentStore + Clone,
    {
        let ctx = EvalContext::new(roots.into());
        let rendered = self
            .sheets
            .iter()
            .map(|sheet| render_sheet(sheet, &self.evaluator, &ctx))
            .collect::<Result<Vec<_>>>()?;

        let mut working = store.clone();
        for (sheet, rows) in self.sheets.iter().zip(&rendered) {
            materialize(&mut working, sheet, rows)?;
        }
        *store = working;
        Ok(())
    }
}

/// Load a template document, render it against `documents` and save the
/// result to `dest_path`. Nothing is written if any step fails.
pub fn write_results<D: AsRef<str>>(
    template_path: &Path,
    dest_path: &Path,
    documents: &[D],
    options: &TemplateOptions,
    sheet: Option<&str>,
) -> Result<()> {
    let started = Instant::now();
    info!(
        template = %template_path.display(),
        output = %dest_path.display(),
        documents = documents.len(),
        "writing results"
    );

    let mut workbook = Workbook::open(template_path)?;
    let template = Template::parse(&workbook, options)?;
    info!(sheets = template.sheets().len(), "template loaded");

    template.render(&mut workbook, documents)?;
    workbook.save(dest_path, sheet)?;

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "results written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook(sheets: &[(&str, &[&str])]) -> Workbook {
        let mut wb = Workbook::new();
        for (name, rows) in sheets {
            let sheet = wb.add_sheet(name);
            for (r, text) in rows.iter().enumerate() {
                sheet.set_text(CellRef::new(1, r + 1), text);
            }
        }
        wb
    }

    #[test]
    fn test_render_all_sheets() {
        let mut wb = workbook(&[
            ("One", &["{{#each $.a}}", "{{= .}}", "{{/each}}"]),
            ("Two", &["{{= $.title}}"]),
        ]);
        let template = Template::parse(&wb, &TemplateOptions::default()).unwrap();
        template
            .render(&mut wb, &[r#"{"a": [1, 2]}"#, r#"{"title": "T"}"#])
            .unwrap();
        assert_eq!(wb.rows("One").unwrap(), vec![vec!["1"], vec!["2"]]);
        assert_eq!(wb.rows("Two").unwrap(), vec![vec!["T"]]);
    }

    #[test]
    fn test_failed_render_leaves_store_untouched() {
        let mut wb = workbook(&[
            ("Good", &["{{#each $.a}}", "{{= .}}", "{{/each}}"]),
            ("Bad", &["{{= $.a}}"]),
        ]);
        let before = wb.clone();
        let template = Template::parse(&wb, &TemplateOptions::default()).unwrap();
        let err = template.render(&mut wb, &[r#"{"a": [1]}"#]).unwrap_err();
        assert!(matches!(err, TabulaError::Render { ref sheet, row: 1, .. } if sheet == "Bad"));
        assert_eq!(wb.rows("Good").unwrap(), before.rows("Good").unwrap());
    }

    #[test]
    fn test_zero_roots_renders_empty() {
        let mut wb = workbook(&[("S", &["{{#each $.a}}", "{{= .}}", "{{/each}}", "end {{= $.x}}"])]);
        let template = Template::parse(&wb, &TemplateOptions::default()).unwrap();
        template.render(&mut wb, &["not json", ""]).unwrap();
        assert_eq!(wb.rows("S").unwrap(), vec![vec!["end "]]);
    }

    #[test]
    fn test_validate_conditions() {
        let wb = workbook(&[("S", &["{{#if $.a > 1}}", "{{= iif($.b ==, 'x')}}", "{{/if}}"])]);
        let template = Template::parse(&wb, &TemplateOptions::default()).unwrap();
        let err = template.validate_conditions().unwrap_err();
        assert!(matches!(err, TabulaError::Expression { ref cell, .. } if cell == "A2"));

        let wb = workbook(&[("S", &["{{#if $.a >}}", "x", "{{/if}}"])]);
        let template = Template::parse(&wb, &TemplateOptions::default()).unwrap();
        assert!(matches!(
            template.validate_conditions(),
            Err(TabulaError::Render { row: 1, .. })
        ));
    }
}
