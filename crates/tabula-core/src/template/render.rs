//! Tree walk: a sheet template plus data to an ordered list of rows.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::trace;

use super::ast::{Node, SheetTemplate, Token};
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{EvalContext, EvalError, Evaluator, Value};

/// One concrete row produced by rendering: computed text per templated column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRow {
    pub sheet: String,
    /// Template row this instance was generated from.
    pub source_row: usize,
    pub values: BTreeMap<usize, String>,
}

struct Renderer<'t> {
    template: &'t SheetTemplate,
    evaluator: &'t Evaluator,
    out: Vec<RenderRow>,
}

impl Renderer<'_> {
    fn error(&self, row: usize, source: EvalError) -> TabulaError {
        TabulaError::Render {
            sheet: self.template.name.clone(),
            row,
            source,
        }
    }

    fn walk(&mut self, nodes: &[Node], ctx: &EvalContext<'_>) -> Result<()> {
        for node in nodes {
            match node {
                Node::Row { row, cells } => {
                    let mut values = BTreeMap::new();
                    for cell in cells {
                        let mut text = String::new();
                        for token in &cell.tokens {
                            match token {
                                Token::Text(s) => text.push_str(s),
                                Token::Expr { expr, .. } => {
                                    let value = self
                                        .evaluator
                                        .scalar_text(expr, ctx)
                                        .map_err(|e| self.error(*row, e))?;
                                    text.push_str(&value);
                                }
                            }
                        }
                        values.insert(cell.col, text);
                    }
                    self.out.push(RenderRow {
                        sheet: self.template.name.clone(),
                        source_row: *row,
                        values,
                    });
                }
                Node::Each {
                    row,
                    path,
                    item_var,
                    index_var,
                    children,
                } => {
                    let Some(items) = ctx.resolve(path).and_then(Value::as_array) else {
                        trace!(row, path = path.as_str(), "each target is not an array, skipped");
                        continue;
                    };
                    for (index, item) in items.iter().enumerate() {
                        let mut scope = ctx.child(item);
                        scope.bind(item_var, Cow::Borrowed(item));
                        if let Some(index_var) = index_var {
                            scope.bind(index_var, Cow::Owned(Value::Number(index as f64)));
                        }
                        self.walk(children, &scope)?;
                    }
                }
                Node::EachObj {
                    row,
                    path,
                    key_var,
                    val_var,
                    children,
                } => {
                    let Some(entries) = ctx.resolve(path).and_then(Value::as_object) else {
                        trace!(row, path = path.as_str(), "each-obj target is not an object, skipped");
                        continue;
                    };
                    // BTreeMap iteration is already in ascending key order
                    for (key, value) in entries {
                        let mut scope = ctx.child(value);
                        scope.bind(key_var, Cow::Owned(Value::String(key.clone())));
                        scope.bind(val_var, Cow::Borrowed(value));
                        self.walk(children, &scope)?;
                    }
                }
                Node::If {
                    row,
                    condition,
                    then_children,
                    else_children,
                } => {
                    let taken = self
                        .evaluator
                        .condition(condition, ctx)
                        .map_err(|e| self.error(*row, e))?;
                    let branch = if taken { then_children } else { else_children };
                    self.walk(branch, ctx)?;
                }
            }
        }
        Ok(())
    }
}

/// Render one sheet. Rows come out in document order.
pub fn render_sheet(
    template: &SheetTemplate,
    evaluator: &Evaluator,
    ctx: &EvalContext<'_>,
) -> Result<Vec<RenderRow>> {
    let mut renderer = Renderer {
        template,
        evaluator,
        out: Vec::new(),
    };
    renderer.walk(&template.nodes, ctx)?;
    Ok(renderer.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Workbook;
    use crate::template::{TemplateOptions, parse_sheet};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabula_engine::engine::CellRef;

    fn template(rows: &[&[&str]]) -> SheetTemplate {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S");
        for (r, cells) in rows.iter().enumerate() {
            for (c, text) in cells.iter().enumerate() {
                sheet.set_text(CellRef::new(c + 1, r + 1), text);
            }
        }
        parse_sheet(&wb, "S", &TemplateOptions::default()).unwrap()
    }

    fn render(tpl: &SheetTemplate, data: serde_json::Value) -> Result<Vec<RenderRow>> {
        let ctx = EvalContext::new(vec![Value::from(data)].into());
        render_sheet(tpl, &Evaluator::new(), &ctx)
    }

    /// First column of every rendered row.
    fn column_a(rows: &[RenderRow]) -> Vec<String> {
        rows.iter()
            .map(|r| r.values.get(&1).cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_each_binds_item_and_index() {
        let tpl = template(&[
            &["{{#each $.items as $it i=$i}}"],
            &["{{= $i+1}}. {{= $it.name}}"],
            &["{{/each}}"],
        ]);
        let rows = render(&tpl, json!({"items": [{"name": "a"}, {"name": "b"}]})).unwrap();
        assert_eq!(column_a(&rows), vec!["1. a", "2. b"]);
        assert!(rows.iter().all(|r| r.source_row == 2 && r.sheet == "S"));
    }

    #[test]
    fn test_each_obj_sorted_keys() {
        let tpl = template(&[
            &["{{#each-obj $.meta as $k $v}}"],
            &["{{= $k}}", "{{= $v}}"],
            &["{{/each-obj}}"],
        ]);
        let rows = render(&tpl, json!({"meta": {"version": "1.0", "owner": "dept"}})).unwrap();
        let pairs: Vec<_> = rows
            .iter()
            .map(|r| (r.values[&1].as_str(), r.values[&2].as_str()))
            .collect();
        assert_eq!(pairs, vec![("owner", "dept"), ("version", "1.0")]);
    }

    #[test]
    fn test_missing_or_non_array_target_renders_nothing() {
        let tpl = template(&[&["{{#each $.items}}"], &["static"], &["{{= .}}"], &["{{/each}}"]]);
        assert!(render(&tpl, json!({})).unwrap().is_empty());
        assert!(render(&tpl, json!({"items": "nope"})).unwrap().is_empty());
        assert!(render(&tpl, json!({"items": []})).unwrap().is_empty());
    }

    #[test]
    fn test_if_else_branches() {
        let tpl = template(&[
            &["{{#if len($.items) > 0}}"],
            &["has {{= len($.items)}}"],
            &["{{else}}"],
            &["empty {{= 'list'}}"],
            &["{{/if}}"],
        ]);
        assert_eq!(column_a(&render(&tpl, json!({"items": [1, 2]})).unwrap()), vec!["has 2"]);
        assert_eq!(column_a(&render(&tpl, json!({"items": []})).unwrap()), vec!["empty list"]);
    }

    #[test]
    fn test_inner_bindings_do_not_leak() {
        let tpl = template(&[
            &["{{#each $.groups as $g}}"],
            &["{{= $g.name}}"],
            &["{{#each $g.items as $g}}"],
            &["{{= $g}}"],
            &["{{/each}}"],
            &["{{= $g.name}}!"],
            &["{{/each}}"],
        ]);
        let rows = render(&tpl, json!({"groups": [{"name": "A", "items": ["x", "y"]}]})).unwrap();
        assert_eq!(column_a(&rows), vec!["A", "x", "y", "A!"]);
    }

    #[test]
    fn test_relative_paths_in_nested_each() {
        let tpl = template(&[
            &["{{#each $.orders}}"],
            &["{{= .id}}"],
            &["{{#each .lines}}"],
            &["", "{{= .sku}} x{{= .qty}}"],
            &["{{/each}}"],
            &["{{/each}}"],
        ]);
        let rows = render(
            &tpl,
            json!({"orders": [
                {"id": 7, "lines": [{"sku": "A", "qty": 2}]},
                {"id": 8, "lines": []}
            ]}),
        )
        .unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.values.values().cloned().collect::<Vec<_>>()).collect();
        assert_eq!(texts, vec![vec!["7".to_string()], vec!["A x2".to_string()], vec!["8".to_string()]]);
    }

    #[test]
    fn test_collection_in_scalar_names_row() {
        let tpl = template(&[&["Title"], &["{{= $.items}}"]]);
        let err = render(&tpl, json!({"items": [1]})).unwrap_err();
        assert!(matches!(err, TabulaError::Render { row: 2, .. }));
        assert!(err.eval_error().is_some_and(EvalError::is_type_mismatch));
    }

    #[test]
    fn test_bad_condition_is_render_error() {
        let tpl = template(&[&["{{#if $.a >>> }}"], &["x"], &["{{/if}}"]]);
        let err = render(&tpl, json!({"a": 1})).unwrap_err();
        assert!(matches!(err, TabulaError::Render { row: 1, .. }));
    }
}
