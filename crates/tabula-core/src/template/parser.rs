//! Directive parser: sheet rows to a block-structured template.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::ast::{CellTemplate, Node, RowTemplate, SheetTemplate, Token};
use super::markers::{Marker, is_control_marker, parse_marker, placeholders};
use super::options::TemplateOptions;
use crate::document::DocumentStore;
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{CellRef, EvalError, ScalarExpr, normalize_var_name};

enum Block {
    Each {
        path: String,
        item_var: String,
        index_var: Option<String>,
    },
    EachObj {
        path: String,
        key_var: String,
        val_var: String,
    },
    If {
        condition: String,
        then_children: Option<Vec<Node>>,
    },
}

/// An open block. `children` is the list nodes are currently appended to;
/// for an `if` past its `{{else}}` that is the else branch.
struct Frame {
    row: usize,
    marker: &'static str,
    block: Block,
    children: Vec<Node>,
}

impl Frame {
    fn finish(self) -> Node {
        let Frame {
            row, block, children, ..
        } = self;
        match block {
            Block::Each {
                path,
                item_var,
                index_var,
            } => Node::Each {
                row,
                path,
                item_var,
                index_var,
                children,
            },
            Block::EachObj {
                path,
                key_var,
                val_var,
            } => Node::EachObj {
                row,
                path,
                key_var,
                val_var,
                children,
            },
            Block::If {
                condition,
                then_children: Some(then_children),
            } => Node::If {
                row,
                condition,
                then_children,
                else_children: children,
            },
            Block::If {
                condition,
                then_children: None,
            } => Node::If {
                row,
                condition,
                then_children: children,
                else_children: Vec::new(),
            },
        }
    }
}

struct SheetParser<'a> {
    sheet: &'a str,
    options: &'a TemplateOptions,
    nodes: Vec<Node>,
    stack: Vec<Frame>,
    span: Option<(usize, usize)>,
}

impl<'a> SheetParser<'a> {
    fn new(sheet: &'a str, options: &'a TemplateOptions) -> Self {
        SheetParser {
            sheet,
            options,
            nodes: Vec::new(),
            stack: Vec::new(),
            span: None,
        }
    }

    fn structural(&self, row: usize, message: impl Into<String>) -> TabulaError {
        TabulaError::Structural {
            sheet: self.sheet.to_string(),
            row,
            message: message.into(),
        }
    }

    fn touch(&mut self, row: usize) {
        self.span = Some(match self.span {
            Some((min, max)) => (min.min(row), max.max(row)),
            None => (row, row),
        });
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.nodes.push(node),
        }
    }

    fn open(&mut self, row: usize, marker: &'static str, block: Block) {
        self.stack.push(Frame {
            row,
            marker,
            block,
            children: Vec::new(),
        });
    }

    fn close(&mut self, row: usize, marker: &Marker<'_>) -> Result<()> {
        let Some(top) = self.stack.last() else {
            return Err(self.structural(row, format!("`{}` without an open block", marker.label())));
        };
        let matches = match (&top.block, marker) {
            (Block::If { .. }, Marker::EndIf) => true,
            (Block::Each { .. }, Marker::EndEach) | (Block::EachObj { .. }, Marker::EndEachObj) => true,
            (Block::Each { .. }, Marker::EndEachObj) | (Block::EachObj { .. }, Marker::EndEach) => {
                !self.options.strict_close_markers
            }
            _ => false,
        };
        if !matches {
            return Err(self.structural(
                row,
                format!(
                    "`{}` cannot close `{}` opened at row {}",
                    marker.label(),
                    top.marker,
                    top.row
                ),
            ));
        }
        if let Some(frame) = self.stack.pop() {
            let node = frame.finish();
            self.append(node);
        }
        Ok(())
    }

    fn begin_else(&mut self, row: usize) -> Result<()> {
        let err = match self.stack.last_mut() {
            Some(Frame {
                block: Block::If { then_children, .. },
                children,
                ..
            }) if then_children.is_none() => {
                *then_children = Some(std::mem::take(children));
                return Ok(());
            }
            Some(Frame {
                block: Block::If { .. },
                row: opened,
                ..
            }) => format!("second `{{{{else}}}}` in the `{{{{#if}}}}` opened at row {}", opened),
            Some(frame) => format!(
                "`{{{{else}}}}` inside `{}` opened at row {}",
                frame.marker, frame.row
            ),
            None => "`{{else}}` without an open `{{#if}}`".to_string(),
        };
        Err(self.structural(row, err))
    }

    fn control(&mut self, row: usize, marker: Marker<'_>) -> Result<()> {
        self.touch(row);
        match marker {
            Marker::Each(header) => {
                let (path, item_var, index_var) = parse_each_header(header);
                if path.is_empty() {
                    return Err(self.structural(row, "`{{#each}}` needs a path"));
                }
                self.open(
                    row,
                    "{{#each}}",
                    Block::Each {
                        path,
                        item_var,
                        index_var,
                    },
                );
            }
            Marker::EachObj(header) => {
                let (path, key_var, val_var) = parse_each_obj_header(header);
                if path.is_empty() {
                    return Err(self.structural(row, "`{{#each-obj}}` needs a path"));
                }
                self.open(
                    row,
                    "{{#each-obj}}",
                    Block::EachObj {
                        path,
                        key_var,
                        val_var,
                    },
                );
            }
            Marker::If(condition) => self.open(
                row,
                "{{#if}}",
                Block::If {
                    condition: condition.trim().to_string(),
                    then_children: None,
                },
            ),
            Marker::Else => self.begin_else(row)?,
            end => self.close(row, &end)?,
        }
        Ok(())
    }

    fn data_row(&mut self, row: usize, cells: &[String]) -> Result<()> {
        let mut templates = Vec::new();
        for (idx, raw) in cells.iter().enumerate() {
            let col = idx + 1;
            let tokens = tokenize(raw).map_err(|source| TabulaError::Expression {
                sheet: self.sheet.to_string(),
                cell: CellRef::new(col, row).to_string(),
                source,
            })?;
            if !tokens.is_empty() {
                templates.push(CellTemplate {
                    col,
                    raw: raw.clone(),
                    tokens,
                });
            }
        }
        if !templates.is_empty() || !self.stack.is_empty() {
            self.touch(row);
            self.append(Node::Row {
                row,
                cells: templates,
            });
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<Node>, Option<(usize, usize)>)> {
        if let Some(open) = self.stack.pop() {
            return Err(TabulaError::Unbalanced {
                sheet: self.sheet.to_string(),
                row: open.row,
                marker: open.marker.to_string(),
            });
        }
        Ok((self.nodes, self.span))
    }
}

/// Split cell text into literal text and parsed `{{= ...}}` expressions.
/// Text without placeholders yields no tokens.
pub fn tokenize(raw: &str) -> std::result::Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for (range, source) in placeholders(raw) {
        if range.start > last {
            tokens.push(Token::Text(raw[last..range.start].to_string()));
        }
        tokens.push(Token::Expr {
            source: source.to_string(),
            expr: ScalarExpr::parse(source)?,
        });
        last = range.end;
    }
    if !tokens.is_empty() && last < raw.len() {
        tokens.push(Token::Text(raw[last..].to_string()));
    }
    Ok(tokens)
}

/// `path [as item] [i=index]`; the item defaults to `$`.
fn parse_each_header(header: &str) -> (String, String, Option<String>) {
    let parts: Vec<&str> = header.split_whitespace().collect();
    let path_len = parts
        .iter()
        .position(|p| *p == "as" || p.starts_with("i="))
        .unwrap_or(parts.len());
    let path = parts[..path_len].join(" ");

    let mut item_var = "$".to_string();
    let mut index_var = None;
    let mut rest = parts[path_len..].iter();
    while let Some(part) = rest.next() {
        if *part == "as" {
            if let Some(name) = rest.next() {
                item_var = normalize_var_name(name);
            }
        } else if let Some(name) = part.strip_prefix("i=") {
            if !name.is_empty() {
                index_var = Some(normalize_var_name(name));
            }
        }
    }
    (path, item_var, index_var)
}

/// `path [as key value]`; defaults `$k` and `$v`.
fn parse_each_obj_header(header: &str) -> (String, String, String) {
    let parts: Vec<&str> = header.split_whitespace().collect();
    let path = parts.first().map(|p| p.to_string()).unwrap_or_default();
    let mut key_var = "$k".to_string();
    let mut val_var = "$v".to_string();
    if parts.len() >= 3 && parts[1] == "as" {
        key_var = normalize_var_name(parts[2]);
        if let Some(name) = parts.get(3) {
            val_var = normalize_var_name(name);
        }
    }
    (path, key_var, val_var)
}

/// Parse one sheet of `store` into a template.
pub fn parse_sheet<S: DocumentStore + ?Sized>(
    store: &S,
    sheet: &str,
    options: &TemplateOptions,
) -> Result<SheetTemplate> {
    let rows = store.rows(sheet)?;
    let mut parser = SheetParser::new(sheet, options);

    for (idx, cells) in rows.iter().enumerate() {
        let row = idx + 1;
        match cells.iter().find_map(|cell| parse_marker(cell)) {
            Some(marker) => parser.control(row, marker)?,
            None => parser.data_row(row, cells)?,
        }
    }

    let (nodes, span) = parser.finish()?;

    let mut template_rows = BTreeSet::new();
    for node in &nodes {
        node.walk(&mut |n| {
            if let Node::Row { row, .. } = n {
                template_rows.insert(*row);
            }
        });
    }

    let merges = store.merges(sheet)?;
    let mut row_templates = BTreeMap::new();
    for row in template_rows {
        let mut tpl = RowTemplate::default();
        for col in 1..=options.max_columns {
            let cell = CellRef::new(col, row);
            let style = store.cell_style(sheet, cell)?;
            if style != 0 {
                tpl.styles.insert(col, style);
            }
            let text = store.cell_text(sheet, cell)?;
            if !text.is_empty() && !is_control_marker(&text) {
                tpl.statics.insert(col, text);
            }
        }
        tpl.merges = merges
            .iter()
            .filter(|m| m.is_within_row(row))
            .map(|m| (m.start.col, m.end.col))
            .collect();
        row_templates.insert(row, tpl);
    }

    let template = SheetTemplate {
        name: sheet.to_string(),
        nodes,
        span,
        row_templates,
    };
    debug!(
        sheet,
        blocks = template.block_count(),
        template_rows = template.row_templates.len(),
        span = ?template.span,
        "parsed sheet template"
    );
    Ok(template)
}
