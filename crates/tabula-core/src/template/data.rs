//! Data documents: JSON text, possibly wrapped in a fenced code block.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use tabula_engine::engine::Value;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\n(.*?)```").expect("valid regex"))
}

/// Strip a surrounding ```` ```lang ... ``` ```` fence, returning the trimmed
/// body. Input without a complete fence is returned unchanged.
pub fn unwrap_fenced(input: &str) -> &str {
    if !input.contains("```") {
        return input;
    }
    fence_re()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map_or(input, |body| body.as_str().trim())
}

/// Parse each input into a root document, in order. Blank inputs are
/// skipped; inputs that are not valid JSON are dropped with a warning.
pub fn parse_documents<I, S>(inputs: I) -> Vec<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roots = Vec::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let text = unwrap_fenced(input.as_ref());
        if text.trim().is_empty() {
            continue;
        }
        match Value::from_json_str(text) {
            Ok(value) => roots.push(value),
            Err(e) => warn!(document = index + 1, error = %e, "skipping data document that is not valid JSON"),
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_fenced() {
        assert_eq!(unwrap_fenced("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(unwrap_fenced("Result:\n```\n[1]\n```\ntrailing"), "[1]");
        assert_eq!(unwrap_fenced("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(unwrap_fenced("```unterminated"), "```unterminated");
    }

    #[test]
    fn test_parse_documents_skips_blank_and_invalid() {
        let roots = parse_documents(["", "  ", "{\"x\": 1}", "not json", "```json\n{\"value\": \"OK\"}\n```"]);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].as_object().and_then(|o| o.get("value")).and_then(Value::as_str), Some("OK"));
    }
}
