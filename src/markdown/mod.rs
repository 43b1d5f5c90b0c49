use pulldown_cmark::{Options, Parser, html};

pub trait MarkdownRenderer: Send + Sync {
    /// Converts markdown to an HTML fragment. Blank input yields an empty string.
    fn render(&self, markdown: &str) -> String;
}

/// Plain CommonMark, no extensions. Output is returned unsanitized.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        if markdown.trim().is_empty() {
            return String::new();
        }

        let parser = Parser::new_ext(markdown, Options::empty());
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Rendered Note</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 40px auto;
            padding: 0 20px;
            color: #333;
        }
        code {
            background-color: #f4f4f4;
            padding: 2px 6px;
            border-radius: 3px;
            font-family: 'Courier New', monospace;
        }
        pre {
            background-color: #f4f4f4;
            padding: 15px;
            border-radius: 5px;
            overflow-x: auto;
        }
        blockquote {
            border-left: 4px solid #ddd;
            margin: 0;
            padding-left: 20px;
            color: #666;
        }
        img {
            max-width: 100%;
            height: auto;
        }
    </style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Wraps a rendered fragment in a standalone HTML page.
pub fn render_page(fragment: &str) -> String {
    let mut page = String::with_capacity(PAGE_HEAD.len() + fragment.len() + PAGE_TAIL.len());
    page.push_str(PAGE_HEAD);
    page.push_str(fragment);
    page.push_str(PAGE_TAIL);
    page
}
