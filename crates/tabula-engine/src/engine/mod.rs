//! Template expression engine.
//!
//! - [`Value`] - Data model for input documents
//! - [`CellRef`], [`MergeRange`] - Cell addressing (A1 notation, 1-based)
//! - [`EvalContext`] - Path resolution against roots, scope and loop variables
//! - [`ScalarExpr`] - Parsed `{{= ...}}` placeholder expressions
//! - [`rewrite_condition`] - Condition dialect to Rhai rewriting
//! - [`Evaluator`] - Scalar and condition evaluation
//! - [`format_value`] - Format values as cell text

mod cell_ref;
mod condition;
mod error;
mod eval;
mod format;
mod path;
mod scalar;
mod value;

pub use cell_ref::{CellRef, MergeRange};
pub use condition::rewrite_condition;
pub use error::EvalError;
pub use eval::{Evaluator, create_engine};
pub use format::{format_number, format_value};
pub use path::{EvalContext, OwnedScope, normalize_var_name};
pub use scalar::ScalarExpr;
pub use value::Value;

pub use rhai::{AST, Dynamic};
