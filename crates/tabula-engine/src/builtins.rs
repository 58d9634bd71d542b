//! Functions available inside boolean conditions.
//!
//! - `path(p)`: resolve a path against the active scope; unit when absent
//! - `len(x)`: length of an array, string (bytes) or map; 0 otherwise.
//!   Registered as [`LEN_FN`] so Rhai's own `len` overloads, which count
//!   string characters, never shadow it.
//! - `exists(x)`: for a string, whether it resolves as a path; otherwise truthiness
//!
//! Conditions are rewritten so that `$.a.b` reaches Rhai as `path("$.a.b")`,
//! `exists($.a)` as `exists("$.a")` and `len(...)` as a [`LEN_FN`] call.
//! Registered closures must be `'static`, so they read the scope through a
//! shared slot that the evaluator fills for the duration of one evaluation.

use std::sync::{Arc, Mutex, PoisonError};

use rhai::{Dynamic, Engine, ImmutableString, Map};

use crate::engine::OwnedScope;

/// Scope visible to the registered functions during an evaluation.
pub type ScopeSlot = Arc<Mutex<Option<OwnedScope>>>;

/// Rhai name of the `len` builtin.
pub const LEN_FN: &str = "value_len";

pub fn register_builtins(engine: &mut Engine, slot: ScopeSlot) {
    let path_slot = Arc::clone(&slot);
    engine.register_fn("path", move |p: &str| -> Dynamic {
        let guard = path_slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .and_then(|scope| scope.context().resolve(p).map(|v| v.to_dynamic()))
            .unwrap_or(Dynamic::UNIT)
    });

    engine.register_fn(LEN_FN, |x: Dynamic| -> i64 { dynamic_len(&x) });

    let exists_slot = slot;
    engine.register_fn("exists", move |x: Dynamic| -> bool {
        match x.clone().try_cast::<ImmutableString>() {
            Some(p) => {
                let guard = exists_slot.lock().unwrap_or_else(PoisonError::into_inner);
                guard
                    .as_ref()
                    .is_some_and(|scope| scope.context().exists(p.as_str()))
            }
            None => dynamic_truthy(&x),
        }
    });
}

pub fn dynamic_len(value: &Dynamic) -> i64 {
    if let Some(s) = value.clone().try_cast::<ImmutableString>() {
        return s.len() as i64;
    }
    if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
        return arr.len() as i64;
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        return map.len() as i64;
    }
    0
}

/// Unit, false, zero, "" and empty collections are falsy.
pub fn dynamic_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(n) = value.as_int() {
        return n != 0;
    }
    if let Ok(n) = value.as_float() {
        return n != 0.0;
    }
    if value.is_string() || value.is_array() || value.is_map() {
        return dynamic_len(value) > 0;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EvalContext, Value};
    use serde_json::json;

    fn engine_with(roots: serde_json::Value) -> Engine {
        let ctx = EvalContext::new(vec![Value::from(roots)].into());
        let slot: ScopeSlot = Arc::new(Mutex::new(Some(ctx.snapshot())));
        let mut engine = Engine::new();
        register_builtins(&mut engine, slot);
        engine
    }

    #[test]
    fn test_path_and_len() {
        let engine = engine_with(json!({"arr": [1, 2, 3], "name": "abc", "word": "héllo"}));
        assert_eq!(engine.eval::<i64>(r#"value_len(path("$.arr"))"#).unwrap(), 3);
        assert_eq!(engine.eval::<i64>(r#"value_len(path("$.name"))"#).unwrap(), 3);
        assert_eq!(engine.eval::<i64>(r#"value_len(path("$.word"))"#).unwrap(), 6);
        assert_eq!(engine.eval::<i64>(r#"value_len(path("$.missing"))"#).unwrap(), 0);
        assert!(engine.eval::<bool>(r#"path("$.missing") == ()"#).unwrap());
    }

    #[test]
    fn test_exists_on_strings_and_values() {
        let engine = engine_with(json!({"flag": false}));
        assert!(engine.eval::<bool>(r#"exists("$.flag")"#).unwrap());
        assert!(!engine.eval::<bool>(r#"exists("$.nope")"#).unwrap());
        assert!(!engine.eval::<bool>("exists(0)").unwrap());
        assert!(engine.eval::<bool>("exists([1])").unwrap());
    }

    #[test]
    fn test_dynamic_truthy() {
        assert!(!dynamic_truthy(&Dynamic::UNIT));
        assert!(!dynamic_truthy(&Dynamic::from(String::new())));
        assert!(!dynamic_truthy(&Dynamic::from_array(vec![])));
        assert!(!dynamic_truthy(&Dynamic::from_float(0.0)));
        assert!(dynamic_truthy(&Dynamic::from_int(2)));
        assert!(dynamic_truthy(&Dynamic::from("x".to_string())));
    }
}
