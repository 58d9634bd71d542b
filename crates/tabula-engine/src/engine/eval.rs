//! Expression evaluation: scalar placeholders and boolean conditions.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use rhai::{AST, Dynamic, Engine};

use super::condition::rewrite_condition;
use super::error::EvalError;
use super::format::format_value;
use super::path::EvalContext;
use super::scalar::ScalarExpr;
use super::value::Value;
use crate::builtins::{ScopeSlot, dynamic_truthy, register_builtins};

/// Create a Rhai engine with the condition built-ins registered against `slot`.
pub fn create_engine(slot: ScopeSlot) -> Engine {
    let mut engine = Engine::new();
    register_builtins(&mut engine, slot);
    engine
}

/// Evaluates scalar expressions and boolean conditions.
///
/// Compiled conditions are cached by their source text.
pub struct Evaluator {
    engine: Engine,
    slot: ScopeSlot,
    compiled: DashMap<String, AST>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        let slot: ScopeSlot = Arc::new(Mutex::new(None));
        Evaluator {
            engine: create_engine(Arc::clone(&slot)),
            slot,
            compiled: DashMap::new(),
        }
    }

    /// Compile a condition without running it, so malformed conditions can be
    /// reported before any data is seen.
    pub fn check_condition(&self, src: &str) -> Result<(), EvalError> {
        self.compile(src).map(|_| ())
    }

    fn compile(&self, src: &str) -> Result<AST, EvalError> {
        if let Some(ast) = self.compiled.get(src) {
            return Ok(ast.clone());
        }
        let rewritten = rewrite_condition(src);
        let ast = self
            .engine
            .compile_expression(&rewritten)
            .map_err(|source| EvalError::ConditionSyntax {
                expr: src.to_string(),
                source,
            })?;
        self.compiled.insert(src.to_string(), ast.clone());
        Ok(ast)
    }

    /// Evaluate a boolean condition; non-boolean results are coerced by truthiness.
    pub fn condition(&self, src: &str, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        let ast = self.compile(src)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(ctx.snapshot());
        let result = self.engine.eval_ast::<Dynamic>(&ast);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        let value = result.map_err(|source| EvalError::Condition {
            expr: src.to_string(),
            source,
        })?;
        Ok(value.as_bool().unwrap_or_else(|_| dynamic_truthy(&value)))
    }

    /// Evaluate a scalar expression to a value.
    pub fn scalar(&self, expr: &ScalarExpr, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        match expr {
            ScalarExpr::Iif {
                condition,
                then,
                otherwise,
            } => {
                if self.condition(condition, ctx)? {
                    self.scalar(then, ctx)
                } else {
                    self.scalar(otherwise, ctx)
                }
            }
            ScalarExpr::Join {
                array,
                separator,
                field,
            } => join(ctx, array, separator, field.as_deref()).map(Value::String),
            ScalarExpr::Len(path) => {
                let len = ctx.resolve(path).and_then(Value::length).unwrap_or(0);
                Ok(Value::Number(len as f64))
            }
            ScalarExpr::Exists(path) => Ok(Value::Bool(ctx.exists(path))),
            ScalarExpr::Literal(text) => Ok(Value::String(text.clone())),
            ScalarExpr::Add { left, right } => {
                let left = ctx.resolve(left).map_or(0.0, Value::coerce_number);
                Ok(Value::Number(left + *right as f64))
            }
            ScalarExpr::Path(path) => match ctx.resolve(path) {
                Some(value) if value.is_collection() => Err(EvalError::CollectionInScalar {
                    expr: path.clone(),
                    found: value.type_name(),
                }),
                Some(value) => Ok(value.clone()),
                None => Ok(path
                    .parse::<i64>()
                    .map(|n| Value::Number(n as f64))
                    .unwrap_or_else(|_| Value::String(String::new()))),
            },
        }
    }

    /// Evaluate a scalar expression straight to cell text.
    pub fn scalar_text(&self, expr: &ScalarExpr, ctx: &EvalContext<'_>) -> Result<String, EvalError> {
        self.scalar(expr, ctx).map(|v| format_value(&v))
    }
}

fn join(
    ctx: &EvalContext<'_>,
    array: &str,
    separator: &str,
    field: Option<&str>,
) -> Result<String, EvalError> {
    let Some(target) = ctx.resolve(array) else {
        return Ok(String::new());
    };
    let Some(items) = target.as_array() else {
        return Err(EvalError::NotAnArray {
            path: array.to_string(),
            found: target.type_name(),
        });
    };
    let parts: Vec<String> = items
        .iter()
        .map(|item| match field {
            Some(field) => ctx.drill(item, field).map(format_value).unwrap_or_default(),
            None => format_value(item),
        })
        .collect();
    Ok(parts.join(separator))
}
