//! src/backend/markdown.rs
//! ============================================================================
//! # CmarkRenderer: Markdown to Terminal Lines
//!
//! Walks the pulldown-cmark event stream and flattens it into plain lines.
//! Block structure survives as prefixes (`## `, `> `, `- `, `1. `, four-space
//! code indent) and blank separator lines. Table rows become one line with
//! ` | ` between cells. Raw html keeps its text and loses its tags. Wrapping
//! is left to the painter, which knows the pane width.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::backend::traits::MarkdownRenderer;
use crate::error::ViewerError;

const RULE_WIDTH: usize = 40;
const CELL_SEPARATOR: &str = " | ";

#[derive(Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

#[derive(Debug, Clone)]
pub struct CmarkRenderer {
    options: Options,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CmarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

fn heading_marks(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "# ",
        HeadingLevel::H2 => "## ",
        HeadingLevel::H3 => "### ",
        HeadingLevel::H4 => "#### ",
        HeadingLevel::H5 => "##### ",
        HeadingLevel::H6 => "###### ",
    }
}

/// Text of an html fragment with every `<...>` tag removed.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

struct LineBuilder {
    out: Vec<String>,
    line: String,
    quote_depth: usize,
}

impl LineBuilder {
    fn flush(&mut self) {
        if !self.line.is_empty() {
            self.out.push(std::mem::take(&mut self.line));
        }
    }

    /// Flush and leave one blank separator, never two in a row.
    fn separate(&mut self) {
        self.flush();
        if self.out.last().is_some_and(|l| !l.is_empty()) {
            self.out.push(String::new());
        }
    }

    fn start_line(&mut self) {
        for _ in 0..self.quote_depth {
            self.line.push_str("> ");
        }
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, text: &str) -> Result<Vec<String>, ViewerError> {
        let mut b = LineBuilder {
            out: Vec::new(),
            line: String::new(),
            quote_depth: 0,
        };
        let mut lists: Vec<ListKind> = Vec::new();
        let mut in_code = false;
        // Cells written on the current table row.
        let mut cells = 0usize;

        for event in Parser::new_ext(text, self.options) {
            if in_code {
                match event {
                    Event::End(TagEnd::CodeBlock) => {
                        in_code = false;
                        b.separate();
                    }
                    Event::Text(t) => {
                        for code_line in t.lines() {
                            b.out.push(format!("    {code_line}"));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    b.flush();
                    b.start_line();
                    b.line.push_str(heading_marks(level));
                }
                Event::Start(Tag::Paragraph) => {
                    if b.line.is_empty() {
                        b.start_line();
                    }
                }
                Event::Start(Tag::BlockQuote(_)) => {
                    b.flush();
                    b.quote_depth += 1;
                }
                Event::Start(Tag::List(start)) => {
                    b.flush();
                    lists.push(start.map_or(ListKind::Bullet, ListKind::Ordered));
                }
                Event::Start(Tag::Item) => {
                    b.flush();
                    b.start_line();
                    b.line.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                    match lists.last_mut() {
                        Some(ListKind::Bullet) => b.line.push_str("- "),
                        Some(ListKind::Ordered(n)) => {
                            b.line.push_str(&format!("{n}. "));
                            *n += 1;
                        }
                        None => {}
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    b.flush();
                    in_code = true;
                }
                Event::End(TagEnd::Paragraph) => {
                    // Tight list items wrap their text in paragraphs too.
                    if lists.is_empty() {
                        b.separate();
                    } else {
                        b.flush();
                    }
                }
                Event::End(TagEnd::Heading(_)) => b.separate(),
                Event::End(TagEnd::BlockQuote(_)) => {
                    b.flush();
                    b.quote_depth = b.quote_depth.saturating_sub(1);
                    b.separate();
                }
                Event::End(TagEnd::List(_)) => {
                    lists.pop();
                    if lists.is_empty() {
                        b.separate();
                    } else {
                        b.flush();
                    }
                }
                Event::End(TagEnd::Item) => b.flush(),
                Event::Start(Tag::Table(_)) => {
                    b.flush();
                    cells = 0;
                }
                Event::Start(Tag::TableCell) => {
                    if cells == 0 {
                        b.start_line();
                    } else {
                        b.line.push_str(CELL_SEPARATOR);
                    }
                    cells += 1;
                }
                Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                    b.flush();
                    cells = 0;
                }
                Event::End(TagEnd::Table) => b.separate(),
                Event::Start(Tag::HtmlBlock) => b.flush(),
                Event::Html(html) => {
                    for raw in html.lines() {
                        let text = strip_tags(raw);
                        let text = text.trim();
                        if !text.is_empty() {
                            b.start_line();
                            b.line.push_str(text);
                            b.flush();
                        }
                    }
                }
                Event::End(TagEnd::HtmlBlock) => b.separate(),
                Event::InlineHtml(_) => {}
                Event::TaskListMarker(done) => {
                    b.line.push_str(if done { "[x] " } else { "[ ] " });
                }
                Event::Text(t) | Event::Code(t) => b.line.push_str(&t),
                Event::SoftBreak => b.line.push(' '),
                Event::HardBreak => {
                    b.flush();
                    b.start_line();
                }
                Event::Rule => {
                    b.flush();
                    b.out.push("─".repeat(RULE_WIDTH));
                    b.out.push(String::new());
                }
                _ => {}
            }
        }
        b.flush();

        while b.out.last().is_some_and(|l| l.is_empty()) {
            b.out.pop();
        }
        Ok(b.out)
    }
}
