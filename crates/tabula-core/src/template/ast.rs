//! Parsed template tree for one sheet.

use std::collections::BTreeMap;

use tabula_engine::engine::ScalarExpr;

/// A piece of templated cell text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Expr { source: String, expr: ScalarExpr },
}

/// A cell containing at least one `{{= ...}}` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct CellTemplate {
    /// 1-based column.
    pub col: usize,
    pub raw: String,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Row {
        row: usize,
        cells: Vec<CellTemplate>,
    },
    Each {
        /// Row of the `{{#each}}` marker.
        row: usize,
        path: String,
        item_var: String,
        index_var: Option<String>,
        children: Vec<Node>,
    },
    EachObj {
        row: usize,
        path: String,
        key_var: String,
        val_var: String,
        children: Vec<Node>,
    },
    If {
        row: usize,
        condition: String,
        then_children: Vec<Node>,
        else_children: Vec<Node>,
    },
}

impl Node {
    /// Row the node was read from (the opening marker for blocks).
    pub fn row(&self) -> usize {
        match self {
            Node::Row { row, .. }
            | Node::Each { row, .. }
            | Node::EachObj { row, .. }
            | Node::If { row, .. } => *row,
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        match self {
            Node::Row { .. } => {}
            Node::Each { children, .. } | Node::EachObj { children, .. } => {
                children.iter().for_each(|n| n.walk(visit));
            }
            Node::If {
                then_children,
                else_children,
                ..
            } => {
                then_children.iter().for_each(|n| n.walk(visit));
                else_children.iter().for_each(|n| n.walk(visit));
            }
        }
    }
}

/// Formatting captured from a template row before rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTemplate {
    /// Column to non-default style id.
    pub styles: BTreeMap<usize, u32>,
    /// Column to non-empty raw text.
    pub statics: BTreeMap<usize, String>,
    /// Horizontal merges on this row as `(start_col, end_col)`.
    pub merges: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetTemplate {
    pub name: String,
    pub nodes: Vec<Node>,
    /// First and last row touched by a directive or template row.
    pub span: Option<(usize, usize)>,
    pub row_templates: BTreeMap<usize, RowTemplate>,
}

impl SheetTemplate {
    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }

    /// Every node in document order, depth first.
    pub fn iter_nodes(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.walk(&mut |n| out.push(n));
        }
        out
    }

    /// Number of `each`, `each-obj` and `if` blocks.
    pub fn block_count(&self) -> usize {
        self.iter_nodes()
            .into_iter()
            .filter(|n| !matches!(n, Node::Row { .. }))
            .count()
    }
}
