use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;
use crate::utils::syntax::highlight_code_block;

/// Render markdown into styled logical lines. Soft breaks become real line
/// breaks, matching chat conventions where a bare newline is intentional.
/// Width-aware wrapping happens downstream.
pub fn render_markdown(
    content: &str,
    base: Style,
    theme: &Theme,
    syntax_enabled: bool,
) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(content, options);

    let mut renderer = Renderer {
        theme,
        syntax_enabled,
        base,
        lines: Vec::new(),
        current: Vec::new(),
        style_stack: vec![base],
        list_stack: Vec::new(),
        quote_depth: 0,
        code_block: None,
        link: None,
        table: None,
        in_image: false,
    };
    renderer.run(parser);
    renderer.lines
}

/// Plain-text rendering used when markdown is toggled off and for roles that
/// never carry markup.
pub fn render_plain(content: &str, base: Style) -> Vec<Line<'static>> {
    content
        .lines()
        .map(|l| {
            if l.is_empty() {
                Line::from("")
            } else {
                Line::from(Span::styled(l.to_string(), base))
            }
        })
        .collect()
}

/// The fenced code blocks of a message, in order, as (language, code) pairs.
/// Unlabeled fences report an empty language.
pub fn extract_code_blocks(content: &str) -> Vec<(String, String)> {
    let parser = Parser::new_ext(content, Options::empty());
    let mut blocks = Vec::new();
    let mut current: Option<(String, String)> = None;
    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        lang.split([',', ' ']).next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                current = Some((lang, String::new()));
            }
            Event::Text(text) => {
                if let Some((_, code)) = current.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }
    blocks
}

enum ListKind {
    Unordered,
    Ordered(u64),
}

struct LinkCapture {
    dest: String,
    text: String,
}

struct TableCapture {
    in_header: bool,
    header_done: bool,
    cell: String,
    row: Vec<String>,
}

struct Renderer<'t> {
    theme: &'t Theme,
    syntax_enabled: bool,
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    quote_depth: usize,
    code_block: Option<(String, String)>,
    link: Option<LinkCapture>,
    table: Option<TableCapture>,
    in_image: bool,
}

impl Renderer<'_> {
    fn run(&mut self, parser: Parser) {
        for event in parser {
            self.handle(event);
        }
        self.flush_line();
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_image {
                    return;
                }
                if let Some((_, buf)) = self.code_block.as_mut() {
                    buf.push_str(&text);
                } else if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&text);
                } else {
                    if let Some(link) = self.link.as_mut() {
                        link.text.push_str(&text);
                    }
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&code);
                } else {
                    self.current
                        .push(Span::styled(code.to_string(), self.theme.inline_code));
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push(' ');
                } else {
                    self.flush_line();
                }
            }
            Event::Rule => {
                self.open_block();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(30), self.theme.rule)));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.current
                    .push(Span::styled(marker.to_string(), self.theme.list_marker));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_text(&html);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                if self.current.is_empty() {
                    self.open_block();
                }
            }
            Tag::Heading { .. } => {
                self.open_block();
                self.style_stack.push(self.theme.heading);
            }
            Tag::BlockQuote(_) => {
                self.open_block();
                self.quote_depth += 1;
                self.style_stack.push(self.theme.blockquote);
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    self.open_block();
                }
                self.list_stack.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Unordered,
                });
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.list_stack.len();
                let marker = match self.list_stack.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let current = *n;
                        *n += 1;
                        format!("{current}. ")
                    }
                    _ => "• ".to_string(),
                };
                let indent = "  ".repeat(depth.saturating_sub(1));
                if !indent.is_empty() {
                    self.current.push(Span::raw(indent));
                }
                self.current
                    .push(Span::styled(marker, self.theme.list_marker));
            }
            Tag::CodeBlock(kind) => {
                self.open_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        lang.split([',', ' ']).next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_block = Some((lang, String::new()));
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } => {
                self.style_stack.push(self.theme.link);
                self.link = Some(LinkCapture {
                    dest: dest_url.to_string(),
                    text: String::new(),
                });
            }
            Tag::Image { dest_url, .. } => {
                // Alt text is swallowed; the placeholder names the target.
                self.in_image = true;
                self.current.push(Span::styled(
                    format!("[image: {dest_url}]"),
                    self.theme.info_text,
                ));
            }
            Tag::Table(_) => {
                self.open_block();
                self.table = Some(TableCapture {
                    in_header: false,
                    header_done: false,
                    cell: String::new(),
                    row: Vec::new(),
                });
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_header = true;
                }
            }
            Tag::TableRow | Tag::TableCell => {}
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::Heading(_) => {
                self.flush_line();
                self.style_stack.pop();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.style_stack.pop();
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code_block.take() {
                    self.emit_code_block(&lang, &code);
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link => {
                self.style_stack.pop();
                if let Some(link) = self.link.take() {
                    if link.text != link.dest && !link.dest.is_empty() {
                        self.current.push(Span::styled(
                            format!(" ({})", link.dest),
                            self.theme.info_text,
                        ));
                    }
                }
            }
            TagEnd::Image => {
                self.in_image = false;
            }
            TagEnd::Table => {
                self.table = None;
            }
            TagEnd::TableHead => {
                self.emit_table_row(true);
                if let Some(table) = self.table.as_mut() {
                    table.in_header = false;
                    table.header_done = true;
                }
            }
            TagEnd::TableRow => self.emit_table_row(false),
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            _ => {}
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(self.base)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.current_style();
        self.current.push(Span::styled(text.to_string(), style));
    }

    /// Separate block-level elements with one blank line.
    fn open_block(&mut self) {
        self.flush_line();
        if let Some(last) = self.lines.last() {
            if !last.spans.is_empty() {
                self.lines.push(Line::from(""));
            }
        }
    }

    fn flush_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.current.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.theme.blockquote,
            ));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn emit_code_block(&mut self, lang: &str, code: &str) {
        let highlighted = if self.syntax_enabled {
            highlight_code_block(lang, code, self.theme)
        } else {
            None
        };
        match highlighted {
            Some(lines) => self.lines.extend(lines),
            None => {
                let mut style = self.theme.code_block_text;
                if let Some(bg) = self.theme.code_block_bg {
                    style = style.bg(bg);
                }
                for line in code.lines() {
                    self.lines
                        .push(Line::from(Span::styled(line.to_string(), style)));
                }
            }
        }
    }

    fn emit_table_row(&mut self, header: bool) {
        let Some(table) = self.table.as_mut() else {
            return;
        };
        if table.row.is_empty() {
            return;
        }
        let row = std::mem::take(&mut table.row);
        let style = if header {
            self.base.add_modifier(Modifier::BOLD)
        } else {
            self.base
        };
        let text = row.join(" │ ");
        let sep_needed = header && !table.header_done;
        self.lines.push(Line::from(Span::styled(text, style)));
        if sep_needed {
            self.lines
                .push(Line::from(Span::styled("─".repeat(30), self.theme.rule)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn dark() -> Theme {
        Theme::dark()
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn soft_breaks_become_new_lines() {
        let lines = render_markdown("first\nsecond", Style::default(), &dark(), false);
        assert_eq!(texts(&lines), vec!["first", "second"]);
    }

    #[test]
    fn paragraphs_separate_with_a_blank_line() {
        let lines = render_markdown("one\n\ntwo", Style::default(), &dark(), false);
        assert_eq!(texts(&lines), vec!["one", "", "two"]);
    }

    #[test]
    fn emphasis_layers_modifiers_on_the_base() {
        let base = Style::default().fg(Color::White);
        let lines = render_markdown("normal *em* **strong**", base, &dark(), false);
        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert_eq!(spans[0].style, base);
        assert!(spans[1].style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(spans[1].style.fg, Some(Color::White));
        assert!(spans[3].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn inline_code_uses_the_code_style() {
        let theme = dark();
        let lines = render_markdown("see `foo()` here", Style::default(), &theme, false);
        let code_span = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "foo()")
            .unwrap();
        assert_eq!(code_span.style, theme.inline_code);
    }

    #[test]
    fn fenced_code_renders_without_fences() {
        let theme = dark();
        let lines = render_markdown(
            "before\n\n```text\nlet x = 1;\nlet y = 2;\n```\n\nafter",
            Style::default(),
            &theme,
            false,
        );
        let rendered = texts(&lines);
        assert_eq!(
            rendered,
            vec!["before", "", "let x = 1;", "let y = 2;", "", "after"]
        );
        // Code lines carry the block background.
        let code_line = &lines[2];
        assert_eq!(code_line.spans[0].style.bg, theme.code_block_bg);
    }

    #[test]
    fn bullet_and_ordered_lists_get_markers() {
        let lines = render_markdown("- alpha\n- beta\n\n1. one\n2. two", Style::default(), &dark(), false);
        let rendered = texts(&lines);
        assert!(rendered.contains(&"• alpha".to_string()));
        assert!(rendered.contains(&"• beta".to_string()));
        assert!(rendered.contains(&"1. one".to_string()));
        assert!(rendered.contains(&"2. two".to_string()));
    }

    #[test]
    fn nested_lists_indent() {
        let lines = render_markdown("- outer\n  - inner", Style::default(), &dark(), false);
        let rendered = texts(&lines);
        assert!(rendered.contains(&"• outer".to_string()));
        assert!(rendered.contains(&"  • inner".to_string()));
    }

    #[test]
    fn blockquotes_carry_a_bar_prefix() {
        let lines = render_markdown("> quoted text", Style::default(), &dark(), false);
        assert_eq!(texts(&lines), vec!["│ quoted text"]);
    }

    #[test]
    fn links_show_their_target_when_it_differs() {
        let lines = render_markdown(
            "[docs](https://example.com/docs)",
            Style::default(),
            &dark(),
            false,
        );
        assert_eq!(texts(&lines), vec!["docs (https://example.com/docs)"]);

        let bare = render_markdown("<https://example.com>", Style::default(), &dark(), false);
        assert_eq!(texts(&bare), vec!["https://example.com"]);
    }

    #[test]
    fn tables_render_as_joined_rows() {
        let lines = render_markdown(
            "| a | b |\n|---|---|\n| 1 | 2 |",
            Style::default(),
            &dark(),
            false,
        );
        let rendered = texts(&lines);
        assert!(rendered.contains(&"a │ b".to_string()));
        assert!(rendered.contains(&"1 │ 2".to_string()));
        // Header separator sits between them.
        let header = rendered.iter().position(|l| l == "a │ b").unwrap();
        assert!(rendered[header + 1].starts_with('─'));
    }

    #[test]
    fn task_markers_render_literally() {
        let lines = render_markdown("- [x] done\n- [ ] open", Style::default(), &dark(), false);
        let rendered = texts(&lines);
        assert!(rendered.contains(&"• [x] done".to_string()));
        assert!(rendered.contains(&"• [ ] open".to_string()));
    }

    #[test]
    fn headings_use_the_heading_style() {
        let theme = dark();
        let lines = render_markdown("## Section", Style::default(), &theme, false);
        assert_eq!(texts(&lines), vec!["Section"]);
        assert_eq!(lines[0].spans[0].style, theme.heading);
    }

    #[test]
    fn plain_rendering_preserves_blank_lines() {
        let lines = render_plain("a\n\nb", Style::default());
        assert_eq!(texts(&lines), vec!["a", "", "b"]);
    }

    #[test]
    fn code_blocks_extract_with_language_tags() {
        let content = "intro\n\n```python\nprint('hi')\n```\n\ntext\n\n```\nplain\n```";
        let blocks = extract_code_blocks(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "python");
        assert_eq!(blocks[0].1, "print('hi')\n");
        assert_eq!(blocks[1].0, "");
        assert_eq!(blocks[1].1, "plain\n");
    }

    #[test]
    fn inline_code_is_not_a_code_block() {
        assert!(extract_code_blocks("just `inline` code").is_empty());
    }
}
