//! Control-marker and placeholder patterns.

use regex::Regex;
use std::sync::OnceLock;

/// A recognized control marker, with its header text where it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker<'a> {
    Each(&'a str),
    EndEach,
    EachObj(&'a str),
    EndEachObj,
    If(&'a str),
    Else,
    EndIf,
}

impl Marker<'_> {
    /// Marker text as written in a cell, without header.
    pub fn label(&self) -> &'static str {
        match self {
            Marker::Each(_) => "{{#each}}",
            Marker::EndEach => "{{/each}}",
            Marker::EachObj(_) => "{{#each-obj}}",
            Marker::EndEachObj => "{{/each-obj}}",
            Marker::If(_) => "{{#if}}",
            Marker::Else => "{{else}}",
            Marker::EndIf => "{{/if}}",
        }
    }
}

fn each_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{#each\s+(.+?)\}\}$").expect("valid regex"))
}

fn each_obj_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{#each-obj\s+(.+?)\}\}$").expect("valid regex"))
}

fn if_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{#if\s+(.+?)\}\}$").expect("valid regex"))
}

fn expr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{=\s*(.+?)\s*\}\}").expect("valid regex"))
}

/// Match trimmed cell text against the control markers.
pub fn parse_marker(text: &str) -> Option<Marker<'_>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text {
        "{{/each}}" => return Some(Marker::EndEach),
        "{{/each-obj}}" => return Some(Marker::EndEachObj),
        "{{else}}" => return Some(Marker::Else),
        "{{/if}}" => return Some(Marker::EndIf),
        _ => {}
    }
    let header = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    };
    if let Some(h) = header(each_obj_re()) {
        return Some(Marker::EachObj(h));
    }
    if let Some(h) = header(each_re()) {
        return Some(Marker::Each(h));
    }
    header(if_re()).map(Marker::If)
}

pub fn is_control_marker(text: &str) -> bool {
    parse_marker(text).is_some()
}

/// Whether the text contains at least one `{{= ...}}` placeholder.
pub fn has_placeholder(text: &str) -> bool {
    expr_re().is_match(text)
}

/// Placeholder occurrences, left to right: byte range of the whole match and
/// the trimmed expression inside it.
pub fn placeholders(text: &str) -> Vec<(std::ops::Range<usize>, &str)> {
    expr_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some((whole.range(), inner.as_str().trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers() {
        assert_eq!(parse_marker("{{#each $.items as $it i=$i}}"), Some(Marker::Each("$.items as $it i=$i")));
        assert_eq!(parse_marker("  {{#each-obj $.meta}} "), Some(Marker::EachObj("$.meta")));
        assert_eq!(parse_marker("{{#if len($.a) > 0}}"), Some(Marker::If("len($.a) > 0")));
        assert_eq!(parse_marker("{{else}}"), Some(Marker::Else));
        assert_eq!(parse_marker("{{/each}}"), Some(Marker::EndEach));
        assert_eq!(parse_marker("{{/each-obj}}"), Some(Marker::EndEachObj));
        assert_eq!(parse_marker("{{/if}}"), Some(Marker::EndIf));
    }

    #[test]
    fn test_non_markers() {
        assert_eq!(parse_marker(""), None);
        assert_eq!(parse_marker("{{#each}}"), None);
        assert_eq!(parse_marker("x {{/each}}"), None);
        assert_eq!(parse_marker("{{= $.name}}"), None);
        assert!(!is_control_marker("{{#if}}"));
    }

    #[test]
    fn test_placeholders() {
        let text = "Total: {{= $.sum }} of {{=len($.items)}}";
        let found: Vec<_> = placeholders(text).into_iter().map(|(_, e)| e).collect();
        assert_eq!(found, vec!["$.sum", "len($.items)"]);
        assert!(has_placeholder(text));
        assert!(!has_placeholder("{{ $.sum }}"));
    }
}
