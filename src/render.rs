//! Markdown to terminal text.
//!
//! Parses with the `markdown` crate (GFM) and lays blocks out line by line.
//! Inline content is collected as styled spans first, so wrapping measures
//! visible text and each word carries its own style when painted.

use crossterm::style::{Attribute, Color, ContentStyle};
use markdown::{mdast, to_mdast, ParseOptions};
use unicode_width::UnicodeWidthStr;

/// Default wrap column.
pub const DEFAULT_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Marks {
    bold: bool,
    italic: bool,
    strike: bool,
    underline: bool,
    code: bool,
    link: bool,
    dim: bool,
    heading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    marks: Marks,
}

/// Renders Markdown for display in a terminal.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    width: usize,
    styled: bool,
}

impl MarkdownRenderer {
    /// `styled = false` produces plain text with no escape codes.
    pub fn new(width: usize, styled: bool) -> Self {
        Self {
            width: width.max(20),
            styled,
        }
    }

    /// Renderer for stdout: ANSI styling only on a terminal without
    /// `NO_COLOR`, wrapped at the terminal width capped to 80 columns.
    pub fn for_stdout() -> Self {
        let is_tty = atty::is(atty::Stream::Stdout);
        let styled = is_tty && std::env::var_os("NO_COLOR").is_none();
        let width = if is_tty {
            crossterm::terminal::size()
                .map(|(cols, _)| usize::from(cols).min(DEFAULT_WIDTH))
                .unwrap_or(DEFAULT_WIDTH)
        } else {
            DEFAULT_WIDTH
        };
        Self::new(width, styled)
    }

    /// Render a Markdown document.
    pub fn render(&self, source: &str) -> String {
        let source = source.replace('\t', "    ");
        if source.trim().is_empty() {
            return String::new();
        }

        let root = match to_mdast(&source, &ParseOptions::gfm()) {
            Ok(node) => node,
            Err(_) => mdast::Node::Text(mdast::Text {
                value: source.clone(),
                position: None,
            }),
        };

        let nodes = match root {
            mdast::Node::Root(root) => root.children,
            other => vec![other],
        };

        self.render_blocks(&nodes, self.width).join("\n")
    }

    fn render_blocks(&self, nodes: &[mdast::Node], width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for node in nodes {
            let block = self.render_block(node, width);
            if block.is_empty() {
                continue;
            }
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.extend(block);
        }
        lines
    }

    fn render_block(&self, node: &mdast::Node, width: usize) -> Vec<String> {
        match node {
            mdast::Node::Heading(heading) => {
                let marks = Marks {
                    bold: true,
                    heading: true,
                    underline: heading.depth == 1,
                    ..Marks::default()
                };
                let mut spans = Vec::new();
                if !self.styled || heading.depth > 2 {
                    spans.push(Span {
                        text: format!("{} ", "#".repeat(usize::from(heading.depth))),
                        marks,
                    });
                }
                collect_inline(&heading.children, marks, &mut spans);
                self.wrap(&spans, width)
            }
            mdast::Node::Paragraph(paragraph) => {
                let mut spans = Vec::new();
                collect_inline(&paragraph.children, Marks::default(), &mut spans);
                self.wrap(&spans, width)
            }
            mdast::Node::Code(code) => self.render_code(code),
            mdast::Node::List(list) => self.render_list(list, width),
            mdast::Node::Blockquote(quote) => {
                let bar = self.paint(
                    "│ ",
                    Marks {
                        dim: true,
                        ..Marks::default()
                    },
                );
                self.render_blocks(&quote.children, width.saturating_sub(2).max(10))
                    .into_iter()
                    .map(|line| format!("{bar}{line}"))
                    .collect()
            }
            mdast::Node::ThematicBreak(_) => vec![self.paint(
                &"─".repeat(width),
                Marks {
                    dim: true,
                    ..Marks::default()
                },
            )],
            mdast::Node::Table(table) => self.render_table(table),
            mdast::Node::Html(html) => html.value.trim_end().lines().map(String::from).collect(),
            mdast::Node::Definition(_) => Vec::new(),
            other => {
                let mut spans = Vec::new();
                collect_inline(std::slice::from_ref(other), Marks::default(), &mut spans);
                self.wrap(&spans, width)
            }
        }
    }

    fn render_code(&self, code: &mdast::Code) -> Vec<String> {
        let fence = Marks {
            dim: true,
            ..Marks::default()
        };
        let body = Marks {
            code: true,
            ..Marks::default()
        };

        let mut lines = vec![self.paint(
            &format!("```{}", code.lang.as_deref().unwrap_or_default()),
            fence,
        )];
        for line in code.value.split('\n') {
            lines.push(format!("  {}", self.paint(line, body)));
        }
        lines.push(self.paint("```", fence));
        lines
    }

    fn render_list(&self, list: &mdast::List, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let start = list.start.unwrap_or(1);

        for (index, node) in list.children.iter().enumerate() {
            let mdast::Node::ListItem(item) = node else {
                continue;
            };

            let mut bullet = if list.ordered {
                format!("{}. ", start + index as u32)
            } else {
                "• ".to_string()
            };
            match item.checked {
                Some(true) => bullet.push_str("[x] "),
                Some(false) => bullet.push_str("[ ] "),
                None => {}
            }

            let indent = " ".repeat(UnicodeWidthStr::width(bullet.as_str()));
            let inner_width = width.saturating_sub(indent.len()).max(10);

            let mut item_lines = Vec::new();
            for child in &item.children {
                item_lines.extend(self.render_block(child, inner_width));
            }
            if item_lines.is_empty() {
                item_lines.push(String::new());
            }

            let painted_bullet = self.paint(
                &bullet,
                Marks {
                    heading: true,
                    ..Marks::default()
                },
            );
            for (line_no, line) in item_lines.into_iter().enumerate() {
                if line_no == 0 {
                    lines.push(format!("{painted_bullet}{line}"));
                } else if line.is_empty() {
                    lines.push(line);
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }

        lines
    }

    fn render_table(&self, table: &mdast::Table) -> Vec<String> {
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .filter_map(|row| match row {
                mdast::Node::TableRow(row) => Some(
                    row.children
                        .iter()
                        .map(|cell| match cell {
                            mdast::Node::TableCell(cell) => plain_text(&cell.children),
                            _ => String::new(),
                        })
                        .collect(),
                ),
                _ => None,
            })
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Vec::new();
        }

        let mut widths = vec![0; columns];
        for row in &rows {
            for (col, cell) in row.iter().enumerate() {
                widths[col] = widths[col].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }

        let border = Marks {
            dim: true,
            ..Marks::default()
        };
        let separator = self.paint(" │ ", border);
        let mut lines = Vec::new();

        for (row_no, row) in rows.iter().enumerate() {
            let cells: Vec<String> = (0..columns)
                .map(|col| {
                    let text = row.get(col).map(String::as_str).unwrap_or_default();
                    let pad = widths[col] - UnicodeWidthStr::width(text);
                    let marks = Marks {
                        bold: row_no == 0,
                        ..Marks::default()
                    };
                    format!("{}{}", self.paint(text, marks), " ".repeat(pad))
                })
                .collect();
            lines.push(cells.join(&separator).trim_end().to_string());

            if row_no == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
                lines.push(self.paint(&rule.join("─┼─"), border));
            }
        }

        lines
    }

    /// Greedy word wrap over styled spans. Hard breaks start a new line.
    fn wrap(&self, spans: &[Span], width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut line_width = 0;
        let mut pending_space: Option<Marks> = None;

        for span in spans {
            for (segment_no, segment) in span.text.split('\n').enumerate() {
                if segment_no > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                    pending_space = None;
                }

                let mut rest = segment;
                while !rest.is_empty() {
                    let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    if word_end == 0 {
                        let space_end = rest
                            .find(|c: char| !c.is_whitespace())
                            .unwrap_or(rest.len());
                        if line_width > 0 {
                            pending_space = Some(span.marks);
                        }
                        rest = &rest[space_end..];
                        continue;
                    }

                    let word = &rest[..word_end];
                    let word_width = UnicodeWidthStr::width(word);
                    let space_width = usize::from(pending_space.is_some());

                    if line_width > 0 && line_width + space_width + word_width > width {
                        lines.push(std::mem::take(&mut line));
                        line_width = 0;
                    } else if let Some(marks) = pending_space {
                        line.push_str(&self.paint(" ", marks));
                        line_width += 1;
                    }
                    pending_space = None;

                    line.push_str(&self.paint(word, span.marks));
                    line_width += word_width;
                    rest = &rest[word_end..];
                }
            }
        }

        if !line.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }

    fn paint(&self, text: &str, marks: Marks) -> String {
        if !self.styled || text.is_empty() || marks == Marks::default() {
            return text.to_string();
        }

        let mut style = ContentStyle::new();
        if marks.heading {
            style.foreground_color = Some(Color::Cyan);
        }
        if marks.code {
            style.foreground_color = Some(Color::Yellow);
        }
        if marks.link {
            style.foreground_color = Some(Color::Blue);
        }
        if marks.dim {
            style.foreground_color = Some(Color::DarkGrey);
        }
        if marks.bold {
            style.attributes.set(Attribute::Bold);
        }
        if marks.italic {
            style.attributes.set(Attribute::Italic);
        }
        if marks.strike {
            style.attributes.set(Attribute::CrossedOut);
        }
        if marks.underline || marks.link {
            style.attributes.set(Attribute::Underlined);
        }

        style.apply(text).to_string()
    }
}

/// Flatten inline nodes into styled spans.
fn collect_inline(nodes: &[mdast::Node], marks: Marks, out: &mut Vec<Span>) {
    for node in nodes {
        match node {
            // Soft line breaks are re-flowed by `wrap`.
            mdast::Node::Text(text) => out.push(Span {
                text: text.value.replace('\n', " "),
                marks,
            }),
            mdast::Node::Strong(strong) => collect_inline(
                &strong.children,
                Marks {
                    bold: true,
                    ..marks
                },
                out,
            ),
            mdast::Node::Emphasis(emphasis) => collect_inline(
                &emphasis.children,
                Marks {
                    italic: true,
                    ..marks
                },
                out,
            ),
            mdast::Node::Delete(delete) => collect_inline(
                &delete.children,
                Marks {
                    strike: true,
                    ..marks
                },
                out,
            ),
            mdast::Node::InlineCode(code) => out.push(Span {
                text: code.value.clone(),
                marks: Marks {
                    code: true,
                    ..marks
                },
            }),
            mdast::Node::Link(link) => {
                collect_inline(
                    &link.children,
                    Marks {
                        link: true,
                        ..marks
                    },
                    out,
                );
                let label = plain_text(&link.children);
                let href = link.url.strip_prefix("mailto:").unwrap_or(&link.url);
                if label != link.url && label != href {
                    out.push(Span {
                        text: format!(" ({})", link.url),
                        marks: Marks {
                            dim: true,
                            ..Marks::default()
                        },
                    });
                }
            }
            mdast::Node::Image(image) => out.push(Span {
                text: if image.alt.is_empty() {
                    image.url.clone()
                } else {
                    image.alt.clone()
                },
                marks,
            }),
            mdast::Node::Break(_) => out.push(Span {
                text: "\n".to_string(),
                marks,
            }),
            mdast::Node::Html(html) => out.push(Span {
                text: html.value.clone(),
                marks,
            }),
            mdast::Node::InlineMath(math) => out.push(Span {
                text: math.value.clone(),
                marks,
            }),
            mdast::Node::Paragraph(paragraph) => collect_inline(&paragraph.children, marks, out),
            _ => {}
        }
    }
}

fn plain_text(nodes: &[mdast::Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            mdast::Node::Text(text) => out.push_str(&text.value),
            mdast::Node::InlineCode(code) => out.push_str(&code.value),
            mdast::Node::Strong(strong) => out.push_str(&plain_text(&strong.children)),
            mdast::Node::Emphasis(emphasis) => out.push_str(&plain_text(&emphasis.children)),
            mdast::Node::Delete(delete) => out.push_str(&plain_text(&delete.children)),
            mdast::Node::Link(link) => out.push_str(&plain_text(&link.children)),
            mdast::Node::Image(image) => out.push_str(&image.alt),
            mdast::Node::Html(html) => out.push_str(&html.value),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(source: &str) -> String {
        MarkdownRenderer::new(DEFAULT_WIDTH, false).render(source)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(plain(""), "");
        assert_eq!(plain("   \n\n"), "");
    }

    #[test]
    fn test_plain_paragraphs() {
        assert_eq!(plain("hello **bold** and *it*\n\nsecond"), "hello bold and it\n\nsecond");
    }

    #[test]
    fn test_plain_headings_keep_markers() {
        assert_eq!(plain("# Title\n\n## Sub"), "# Title\n\n## Sub");
    }

    #[test]
    fn test_wraps_at_width() {
        let renderer = MarkdownRenderer::new(20, false);
        let text = "one two three four five six seven eight nine ten";
        let rendered = renderer.render(text);

        for line in rendered.lines() {
            assert!(line.chars().count() <= 20, "line too long: {line:?}");
        }
        let rejoined: Vec<&str> = rendered.split_whitespace().collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn test_soft_breaks_reflow() {
        assert_eq!(plain("first line\nsecond line"), "first line second line");
        assert_eq!(plain("hard  \nbreak"), "hard\nbreak");
    }

    #[test]
    fn test_long_word_not_split() {
        let renderer = MarkdownRenderer::new(20, false);
        let word = "a".repeat(30);
        assert_eq!(renderer.render(&format!("x {word}")), format!("x\n{word}"));
    }

    #[test]
    fn test_code_block() {
        let rendered = plain("```bash\nkubectl get pods\nls -la\n```");
        assert_eq!(rendered, "```bash\n  kubectl get pods\n  ls -la\n```");
    }

    #[test]
    fn test_lists() {
        let rendered = plain("- one\n- two\n  - nested\n\n1. first\n2. second");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "• one");
        assert_eq!(lines[1], "• two");
        assert_eq!(lines[2], "  • nested");
        assert!(rendered.contains("1. first"));
        assert!(rendered.contains("2. second"));
    }

    #[test]
    fn test_task_list() {
        let rendered = plain("- [x] done\n- [ ] todo");
        assert_eq!(rendered, "• [x] done\n• [ ] todo");
    }

    #[test]
    fn test_link_shows_url() {
        assert_eq!(
            plain("see [docs](https://example.com)"),
            "see docs (https://example.com)"
        );
        assert_eq!(
            plain("<https://example.com>"),
            "https://example.com"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(plain("> quoted text"), "│ quoted text");
    }

    #[test]
    fn test_table() {
        let rendered = plain("| a | bb |\n|---|---|\n| ccc | d |");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "a   │ bb");
        assert_eq!(lines[1], "────┼───");
        assert_eq!(lines[2], "ccc │ d");
    }

    #[test]
    fn test_thematic_break() {
        let renderer = MarkdownRenderer::new(30, false);
        assert_eq!(renderer.render("---"), "─".repeat(30));
    }

    #[test]
    fn test_styled_output_has_escapes() {
        let renderer = MarkdownRenderer::new(DEFAULT_WIDTH, true);
        let rendered = renderer.render("# Title\n\nsome `code`");
        assert!(rendered.contains('\u{1b}'));
        assert!(rendered.contains("Title"));
        assert!(rendered.contains("code"));
    }

    #[test]
    fn test_plain_output_has_no_escapes() {
        let rendered = plain("# Title\n\n**bold** `code` [x](http://y)\n\n```\nz\n```");
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn test_fallback_text_renders() {
        let rendered = plain(crate::client::openwebui::NO_RESPONSE_FALLBACK);
        assert_eq!(rendered, crate::client::openwebui::NO_RESPONSE_FALLBACK);
    }
}
