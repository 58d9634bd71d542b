//! Path resolution against an evaluation context.
//!
//! Supported forms, checked in order:
//!
//! - `.` - the current scope value
//! - `$root`, `$root.a.b` - absolute, searched through every root document
//! - `$.a.b` - same as `$root.a.b`
//! - `$` - the first non-null root document
//! - `$name.a[0]` - a loop variable, then drilled
//! - `.a.b` - relative to the current scope value
//! - `a.b` - bare paths are absolute
//!
//! Drilling understands `field`, `[N]` and `[<path>]` segments. A bracketed
//! path must resolve to a number or a numeric string. Any mismatch along the
//! way is a failed resolution, never an error.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::value::Value;

/// Scope for evaluating paths: current value, loop variables and root documents.
///
/// Children copy their parent's variables and add their own, so bindings made
/// inside a loop body never leak to siblings or ancestors.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    current: Option<&'a Value>,
    parent: Option<&'a EvalContext<'a>>,
    roots: Arc<[Value]>,
    vars: BTreeMap<String, Cow<'a, Value>>,
}

impl EvalContext<'static> {
    /// Top-level context with no current value and no variables.
    pub fn new(roots: Arc<[Value]>) -> Self {
        EvalContext {
            current: None,
            parent: None,
            roots,
            vars: BTreeMap::new(),
        }
    }
}

impl<'a> EvalContext<'a> {
    /// Context for one loop iteration over `current`.
    pub fn child<'s>(&'s self, current: &'s Value) -> EvalContext<'s> {
        EvalContext {
            current: Some(current),
            parent: Some(self),
            roots: Arc::clone(&self.roots),
            vars: self.vars.clone(),
        }
    }

    /// Bind a variable. Names without a leading `$` get one.
    pub fn bind(&mut self, name: &str, value: Cow<'a, Value>) {
        self.vars.insert(normalize_var_name(name), value);
    }

    pub fn current(&self) -> Option<&Value> {
        self.current
    }

    pub fn parent(&self) -> Option<&EvalContext<'a>> {
        self.parent
    }

    /// Nesting depth; the top-level context is 0.
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }

    pub fn roots(&self) -> &[Value] {
        &self.roots
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|v| v.as_ref())
    }

    /// Resolve `path` to a value, or None when any step fails.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path == "." {
            return self.current.filter(|v| !v.is_null());
        }
        if let Some(rest) = root_rest(path) {
            return self.resolve_in_roots(rest);
        }
        if let Some(after) = path.strip_prefix('$') {
            let name_len = var_name_len(after);
            if name_len == 0 {
                return None;
            }
            let (name, rest) = after.split_at(name_len);
            let rest = match rest.strip_prefix('.') {
                Some(tail) => tail,
                None if rest.is_empty() || rest.starts_with('[') => rest,
                None => return None,
            };
            let value = self.vars.get(&format!("${}", name))?;
            return self.drill(value.as_ref(), rest);
        }
        if let Some(rest) = path.strip_prefix('.') {
            let current = self.current?;
            if rest.is_empty() {
                return Some(current);
            }
            return self.drill(current, rest);
        }
        self.resolve_in_roots(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    fn resolve_in_roots(&self, rest: &str) -> Option<&Value> {
        self.roots.iter().find_map(|root| {
            if rest.is_empty() {
                (!root.is_null()).then_some(root)
            } else {
                self.drill(root, rest)
            }
        })
    }

    /// Walk `path` segments down from `value`.
    pub fn drill<'v>(&self, value: &'v Value, path: &str) -> Option<&'v Value> {
        let mut cur = value;
        let mut rest = path;
        while !rest.is_empty() {
            let (segment, tail) = next_segment(rest)?;
            cur = match segment {
                Segment::Field(name) => cur.as_object()?.get(name)?,
                Segment::Index(inner) => {
                    let items = cur.as_array()?;
                    let index = self.index_value(inner)?;
                    items.get(index)?
                }
            };
            rest = tail;
        }
        Some(cur)
    }

    fn index_value(&self, inner: &str) -> Option<usize> {
        let inner = inner.trim();
        if let Ok(n) = inner.parse::<i64>() {
            return usize::try_from(n).ok();
        }
        match self.resolve(inner)? {
            Value::Number(n) => usize::try_from(n.trunc() as i64).ok(),
            Value::String(s) => s.parse::<i64>().ok().and_then(|n| usize::try_from(n).ok()),
            _ => None,
        }
    }

    /// Detach into an owned scope that can outlive this borrow.
    pub fn snapshot(&self) -> OwnedScope {
        OwnedScope {
            current: self.current.cloned(),
            roots: Arc::clone(&self.roots),
            vars: self
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref().clone()))
                .collect(),
        }
    }
}

/// An owned copy of a context's state, used where `'static` data is required.
#[derive(Debug, Clone, Default)]
pub struct OwnedScope {
    current: Option<Value>,
    roots: Arc<[Value]>,
    vars: BTreeMap<String, Value>,
}

impl OwnedScope {
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext {
            current: self.current.as_ref(),
            parent: None,
            roots: Arc::clone(&self.roots),
            vars: self
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), Cow::Borrowed(v)))
                .collect(),
        }
    }
}

/// Prefix a variable name with `$` unless it already has one.
pub fn normalize_var_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${}", name)
    }
}

/// Byte length of the variable name at the start of `s`.
fn var_name_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}

/// Remainder of an absolute path (`$root...`, `$.` or `$`), if `path` is one.
fn root_rest(path: &str) -> Option<&str> {
    if path == "$" || path == "$root" {
        return Some("");
    }
    if let Some(rest) = path.strip_prefix("$root") {
        if let Some(tail) = rest.strip_prefix('.') {
            return Some(tail);
        }
        if rest.starts_with('[') {
            return Some(rest);
        }
        return None;
    }
    path.strip_prefix("$.")
}

enum Segment<'p> {
    Field(&'p str),
    Index(&'p str),
}

/// Split the first segment off a drill path.
fn next_segment(path: &str) -> Option<(Segment<'_>, &str)> {
    if let Some(body) = path.strip_prefix('[') {
        let close = matching_bracket(body)?;
        let tail = &body[close + 1..];
        let tail = tail.strip_prefix('.').unwrap_or(tail);
        return Some((Segment::Index(&body[..close]), tail));
    }
    let end = path.find(['.', '[']).unwrap_or(path.len());
    let (field, tail) = path.split_at(end);
    let tail = tail.strip_prefix('.').unwrap_or(tail);
    Some((Segment::Field(field), tail))
}

/// Index of the `]` closing a bracket whose body starts at `body[0]`.
fn matching_bracket(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(i),
            b']' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roots(values: Vec<serde_json::Value>) -> Arc<[Value]> {
        values.into_iter().map(Value::from).collect()
    }

    #[test]
    fn test_absolute_forms_agree() {
        let ctx = EvalContext::new(roots(vec![json!({"user": {"name": "Ann"}})]));
        let expected = Value::from("Ann");
        assert_eq!(ctx.resolve("$.user.name"), Some(&expected));
        assert_eq!(ctx.resolve("$root.user.name"), Some(&expected));
        assert_eq!(ctx.resolve("user.name"), Some(&expected));
        assert!(ctx.resolve("$").is_some());
        assert!(ctx.resolve("$root").is_some());
    }

    #[test]
    fn test_first_root_with_key_wins() {
        let ctx = EvalContext::new(roots(vec![
            json!({"x": 1}),
            json!({"value": "OK"}),
            json!({"value": "late"}),
        ]));
        assert_eq!(ctx.resolve("$.value"), Some(&Value::from("OK")));
        assert_eq!(ctx.resolve("$.x"), Some(&Value::from(1.0)));
    }

    #[test]
    fn test_bare_dollar_skips_null_roots() {
        let ctx = EvalContext::new(roots(vec![json!(null), json!({"a": 1})]));
        assert_eq!(ctx.resolve("$").and_then(Value::as_object).map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_no_roots_resolves_nothing() {
        let ctx = EvalContext::new(Arc::from(Vec::<Value>::new()));
        assert!(ctx.resolve("$").is_none());
        assert!(ctx.resolve("$.a").is_none());
        assert!(ctx.resolve(".").is_none());
    }

    #[test]
    fn test_current_and_relative_paths() {
        let ctx = EvalContext::new(roots(vec![json!({})]));
        let item = Value::from(json!({"done": true, "tags": ["a", "b"]}));
        let child = ctx.child(&item);
        assert_eq!(child.resolve("."), Some(&item));
        assert_eq!(child.resolve(".done"), Some(&Value::Bool(true)));
        assert_eq!(child.resolve(".tags[1]"), Some(&Value::from("b")));
        assert!(child.resolve(".missing").is_none());
    }

    #[test]
    fn test_variables_and_dynamic_index() {
        let ctx = EvalContext::new(roots(vec![json!({"report": {"date": "2024-01-01"}})]));
        let group = Value::from(json!({"rows": [{"v": "r0"}, {"v": "r1"}]}));
        let mut child = ctx.child(&group);
        child.bind("$g", Cow::Borrowed(&group));
        child.bind("ri", Cow::Owned(Value::from(1.0)));
        assert_eq!(child.resolve("$g.rows[$ri].v"), Some(&Value::from("r1")));
        assert_eq!(child.resolve("$g.rows[0].v"), Some(&Value::from("r0")));
        assert_eq!(child.resolve("$root.report.date"), Some(&Value::from("2024-01-01")));
        assert!(child.resolve("$unknown").is_none());
        assert!(child.resolve("$g.rows[5]").is_none());
        assert!(child.resolve("$g.rows[-1]").is_none());
    }

    #[test]
    fn test_numeric_string_index() {
        let ctx = EvalContext::new(roots(vec![json!({"i": "1", "bad": "x", "arr": [10, 20]})]));
        assert_eq!(ctx.resolve("$.arr[$.i]"), Some(&Value::from(20.0)));
        assert!(ctx.resolve("$.arr[$.bad]").is_none());
    }

    #[test]
    fn test_type_mismatch_is_absence() {
        let ctx = EvalContext::new(roots(vec![json!({"s": "text", "arr": [1]})]));
        assert!(ctx.resolve("$.s.field").is_none());
        assert!(ctx.resolve("$.arr.field").is_none());
        assert!(ctx.resolve("$.s[0]").is_none());
    }

    #[test]
    fn test_child_bindings_shadow_without_leaking() {
        let ctx = EvalContext::new(roots(vec![json!({})]));
        let outer_item = Value::from("outer");
        let inner_item = Value::from("inner");
        let mut outer = ctx.child(&outer_item);
        outer.bind("$x", Cow::Borrowed(&outer_item));
        {
            let mut inner = outer.child(&inner_item);
            inner.bind("$x", Cow::Borrowed(&inner_item));
            assert_eq!(inner.resolve("$x"), Some(&inner_item));
            assert_eq!(inner.depth(), 2);
        }
        assert_eq!(outer.resolve("$x"), Some(&outer_item));
        assert!(ctx.resolve("$x").is_none());
    }

    #[test]
    fn test_snapshot_resolves_like_borrowed_context() {
        let ctx = EvalContext::new(roots(vec![json!({"a": {"b": 2}})]));
        let item = Value::from(json!({"c": 3}));
        let mut child = ctx.child(&item);
        child.bind("$it", Cow::Borrowed(&item));
        let scope = child.snapshot();
        let restored = scope.context();
        assert_eq!(restored.resolve("$.a.b"), Some(&Value::from(2.0)));
        assert_eq!(restored.resolve("$it.c"), Some(&Value::from(3.0)));
        assert_eq!(restored.resolve(".c"), Some(&Value::from(3.0)));
    }
}
