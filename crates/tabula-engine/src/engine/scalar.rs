//! Scalar expressions: the contents of an inline `{{= ...}}` placeholder.
//!
//! The grammar is small and closed, so each expression is parsed once into a
//! [`ScalarExpr`] and evaluated by matching on it.

use super::error::EvalError;
use super::value::Value;

/// A parsed scalar expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarExpr {
    /// `iif(cond, then[, else])`; `cond` is a boolean expression.
    Iif {
        condition: String,
        then: Box<ScalarExpr>,
        otherwise: Box<ScalarExpr>,
    },
    /// `join(arrayPath, sep[, fieldPath])`
    Join {
        array: String,
        separator: String,
        field: Option<String>,
    },
    /// `len(path)`
    Len(String),
    /// `exists(path)`
    Exists(String),
    /// `'text'` or `"text"`
    Literal(String),
    /// `path + N`
    Add { left: String, right: i64 },
    /// Anything else: a path, falling back to an integer literal.
    Path(String),
}

impl ScalarExpr {
    /// Parse expression text. Only call arity is checked here; unresolvable
    /// paths are a render-time concern.
    pub fn parse(expr: &str) -> Result<ScalarExpr, EvalError> {
        let expr = expr.trim();

        if let Some(inner) = call_body(expr, "iif") {
            let args = split_args(inner);
            if args.len() < 2 {
                return Err(EvalError::Arity {
                    function: "iif",
                    expected: 2,
                    found: args.len(),
                });
            }
            let otherwise = match args.get(2) {
                Some(arg) => ScalarExpr::parse(arg)?,
                None => ScalarExpr::Literal(String::new()),
            };
            return Ok(ScalarExpr::Iif {
                condition: args[0].to_string(),
                then: Box::new(ScalarExpr::parse(args[1])?),
                otherwise: Box::new(otherwise),
            });
        }

        if let Some(inner) = call_body(expr, "join") {
            let args = split_args(inner);
            if args.len() < 2 {
                return Err(EvalError::Arity {
                    function: "join",
                    expected: 2,
                    found: args.len(),
                });
            }
            let field = args.get(2).map(|f| strip_quotes(f)).filter(|f| !f.is_empty());
            return Ok(ScalarExpr::Join {
                array: args[0].to_string(),
                separator: strip_quotes(args[1]).to_string(),
                field: field.map(str::to_string),
            });
        }

        if let Some(inner) = call_body(expr, "len") {
            return Ok(ScalarExpr::Len(inner.trim().to_string()));
        }

        if let Some(inner) = call_body(expr, "exists") {
            return Ok(ScalarExpr::Exists(inner.trim().to_string()));
        }

        if let Some(text) = quoted_literal(expr) {
            return Ok(ScalarExpr::Literal(text.to_string()));
        }

        if let Some((left, right)) = split_single_plus(expr) {
            return Ok(ScalarExpr::Add {
                left: left.trim().to_string(),
                right: right.trim().parse::<i64>().unwrap_or(0),
            });
        }

        Ok(ScalarExpr::Path(expr.to_string()))
    }

    /// Boolean conditions nested in this expression, in evaluation order.
    pub fn conditions(&self) -> Vec<&str> {
        match self {
            ScalarExpr::Iif {
                condition,
                then,
                otherwise,
            } => {
                let mut out = vec![condition.as_str()];
                out.extend(then.conditions());
                out.extend(otherwise.conditions());
                out
            }
            _ => Vec::new(),
        }
    }
}

/// If `expr` is `name(...)` with the opening parenthesis closed by the last
/// character, return the text between the parentheses.
fn call_body<'e>(expr: &'e str, name: &str) -> Option<&'e str> {
    let after_name = expr.strip_prefix(name)?;
    let body = after_name.strip_prefix('(')?;
    let close = closing_paren(body)?;
    (close == body.len() - 1).then(|| &body[..close])
}

/// Byte index of the `)` matching an already-consumed `(`, skipping quoted text.
fn closing_paren(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, b) in body.bytes().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' if depth == 0 => return Some(i),
            b')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split call arguments on top-level commas, respecting quotes and nesting.
pub(crate) fn split_args(s: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0usize;
    for (i, b) in s.bytes().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last);
    }
    args
}

fn quoted_literal(expr: &str) -> Option<&str> {
    let bytes = expr.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let first = bytes[0];
    if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
        Some(&expr[1..expr.len() - 1])
    } else {
        None
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(['"', '\''])
}

/// Split on the only `+` outside quotes, parentheses and brackets.
fn split_single_plus(expr: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut found = None;
    for (i, b) in expr.bytes().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'+' if depth == 0 => {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            }
            _ => {}
        }
    }
    found.map(|i| (&expr[..i], &expr[i + 1..]))
}
