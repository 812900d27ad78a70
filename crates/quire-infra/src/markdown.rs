//! CommonMark rendering via pulldown-cmark.

use pulldown_cmark::{Event, Options, Parser, Tag, html};

use quire_core::ports::MarkdownRenderer;

/// Renders CommonMark plus tables, strikethrough and task lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownMarkdown;

impl PulldownMarkdown {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for PulldownMarkdown {
    fn to_html(&self, markdown: &str) -> String {
        if markdown.trim().is_empty() {
            return String::new();
        }

        let parser = Parser::new_ext(markdown, Self::options());
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }

    fn to_plain_text(&self, markdown: &str, limit: usize) -> String {
        let mut text = String::new();

        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(Tag::Paragraph | Tag::Heading(..) | Tag::Item) => text.push(' '),
                _ => {}
            }
        }

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() <= limit {
            return text;
        }

        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_html() {
        let md = PulldownMarkdown::new();
        let html = md.to_html("# Title\n\nSome *emphasis* here.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn test_empty_input_renders_empty() {
        assert_eq!(PulldownMarkdown::new().to_html("   "), "");
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let md = PulldownMarkdown::new();
        let text = md.to_plain_text("# Hello\n\nA **bold** `move`.", 100);
        assert_eq!(text, "Hello A bold move.");
    }

    #[test]
    fn test_plain_text_truncates_on_chars() {
        let md = PulldownMarkdown::new();
        assert_eq!(md.to_plain_text("héllo wörld", 5), "héllo...");
        assert_eq!(md.to_plain_text("short", 5), "short");
    }
}
