use serde::Deserialize;

/// Template loading options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateOptions {
    /// Columns scanned when capturing a row template.
    pub max_columns: usize,
    /// Require `{{/each}}` to close `{{#each}}` and `{{/each-obj}}` to close
    /// `{{#each-obj}}`. When false either closes either loop.
    pub strict_close_markers: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        TemplateOptions {
            max_columns: 100,
            strict_close_markers: true,
        }
    }
}
