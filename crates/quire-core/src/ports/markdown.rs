/// Markdown renderer port. Rendering rules belong to the implementation.
pub trait MarkdownRenderer: Send + Sync {
    /// Render markdown to HTML. Empty input renders to an empty string.
    fn to_html(&self, markdown: &str) -> String;

    /// Text content of the rendered markdown, cut to `limit` characters with
    /// a trailing `...` when longer.
    fn to_plain_text(&self, markdown: &str, limit: usize) -> String;
}
