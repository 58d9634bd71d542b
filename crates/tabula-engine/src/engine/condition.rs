//! Boolean conditions (`{{#if ...}}` and the first argument of `iif`).
//!
//! Conditions are written in a small expression dialect with `$`-paths,
//! word operators (`and`, `or`, `not`), `nil` and single-quoted strings.
//! [`rewrite_condition`] turns that into a Rhai expression in which every
//! path becomes a `path("...")` call, and Rhai does the rest.

use crate::builtins::LEN_FN;

/// Rewrite condition source into a Rhai expression.
///
/// - `$.a.b`, `$x.c[$i]`, `$root.x` become `path("$.a.b")` and so on
/// - `.field` at the start of an operand becomes `path(".field")`
/// - `exists($.a)` passes the path text itself: `exists("$.a")`
/// - `len(...)` calls the byte-counting builtin
/// - `and`/`or`/`not` become `&&`/`||`/`!` and `nil` becomes `()`
/// - `'text'` becomes `"text"`
///
/// Text inside string literals is never rewritten.
pub fn rewrite_condition(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len() + 16);
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' => {
                let end = closing_quote(bytes, i);
                let body = &src[i + 1..end.min(bytes.len())];
                push_string_literal(&mut out, body, b);
                i = (end + 1).min(bytes.len());
            }
            b'$' => {
                let end = scan_dollar_path(bytes, i);
                if end > i + 1 {
                    push_path_call(&mut out, &src[i..end]);
                    i = end;
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            b'.' if at_operand_start(&out)
                && bytes.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_') =>
            {
                let end = scan_path_chars(bytes, i + 1);
                push_path_call(&mut out, &src[i..end]);
                i = end;
            }
            _ if b.is_ascii_alphabetic() || b == b'_' => {
                let end = i + bytes[i..]
                    .iter()
                    .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
                    .count();
                let word = &src[i..end];
                let is_call = !out.trim_end().ends_with('.')
                    && bytes[end..].iter().find(|c| !c.is_ascii_whitespace()) == Some(&b'(');
                match word {
                    "and" => out.push_str("&&"),
                    "or" => out.push_str("||"),
                    "not" => out.push('!'),
                    "nil" => out.push_str("()"),
                    "len" if is_call => out.push_str(LEN_FN),
                    "exists" if is_call => {
                        if let Some((path, after)) = path_argument(bytes, end) {
                            out.push_str("exists(");
                            push_quoted(&mut out, &src[path]);
                            out.push(')');
                            i = after;
                            continue;
                        }
                        out.push_str(word);
                    }
                    _ => out.push_str(word),
                }
                i = end;
            }
            _ => {
                let ch_len = utf8_len(b);
                let end = (i + ch_len).min(bytes.len());
                out.push_str(&src[i..end]);
                i = end;
            }
        }
    }
    out
}

/// Index of the quote closing the literal opened at `start`, or `bytes.len()`.
fn closing_quote(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn push_string_literal(out: &mut String, body: &str, quote: u8) {
    out.push('"');
    if quote == b'"' {
        out.push_str(body);
    } else {
        for ch in body.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
        }
    }
    out.push('"');
}

fn push_path_call(out: &mut String, path: &str) {
    out.push_str("path(");
    push_quoted(out, path);
    out.push(')');
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

/// When the call whose name ends at `from` takes a single bare path, the
/// path's byte range and the index just past the closing `)`.
fn path_argument(bytes: &[u8], from: usize) -> Option<(std::ops::Range<usize>, usize)> {
    let skip_ws = |mut k: usize| {
        while bytes.get(k).is_some_and(u8::is_ascii_whitespace) {
            k += 1;
        }
        k
    };
    let open = skip_ws(from);
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let start = skip_ws(open + 1);
    let end = match *bytes.get(start)? {
        b'$' => scan_dollar_path(bytes, start),
        b'.' if bytes.get(start + 1).is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_') => {
            scan_path_chars(bytes, start + 1)
        }
        _ => return None,
    };
    if end <= start + 1 {
        return None;
    }
    let close = skip_ws(end);
    (bytes.get(close) == Some(&b')')).then_some((start..end, close + 1))
}

/// End of a `$`-path starting at `start`: either `$.` or `$name` (with an
/// optional trailing dot), then any run of path characters.
fn scan_dollar_path(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 1;
    if bytes.get(j) == Some(&b'.') {
        j += 1;
    } else {
        while j < bytes.len() && (bytes[j].is_ascii_alphabetic() || bytes[j] == b'_') {
            j += 1;
        }
        if bytes.get(j) == Some(&b'.') {
            j += 1;
        }
    }
    scan_path_chars(bytes, j)
}

fn scan_path_chars(bytes: &[u8], from: usize) -> usize {
    let mut k = from;
    while k < bytes.len() && is_path_byte(bytes[k]) {
        k += 1;
    }
    k
}

fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'[' | b']' | b'$')
}

/// True when the last emitted token cannot end an operand, so a `.` here
/// starts a relative path rather than a member access or a float.
fn at_operand_start(out: &str) -> bool {
    match out.trim_end().bytes().last() {
        None => true,
        Some(b) => !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b')' | b']' | b'"')),
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}
