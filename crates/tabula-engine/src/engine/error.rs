use rhai::{EvalAltResult, ParseError};
use thiserror::Error;

/// Errors raised while evaluating template expressions.
///
/// Unresolvable paths are never errors; they evaluate to absence.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("{function}: expected at least {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("join: `{path}` is a {found}, not an array")]
    NotAnArray { path: String, found: &'static str },

    #[error("`{expr}` is a {found}: cannot insert a collection where a scalar is expected (use each or join)")]
    CollectionInScalar { expr: String, found: &'static str },

    #[error("condition `{expr}` does not parse: {source}")]
    ConditionSyntax {
        expr: String,
        #[source]
        source: ParseError,
    },

    #[error("condition `{expr}` failed: {source}")]
    Condition {
        expr: String,
        #[source]
        source: Box<EvalAltResult>,
    },
}

impl EvalError {
    /// True for errors caused by the shape of the data rather than the template text.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, EvalError::NotAnArray { .. } | EvalError::CollectionInScalar { .. })
    }
}
