use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Wrap styled lines to a display width, breaking at word boundaries and
/// chunking words wider than the full line. Rendering never relies on
/// ratatui's built-in wrap, so these counts are the scroll math's ground
/// truth.
pub fn wrap_styled_lines(lines: &[Line], width: u16) -> Vec<Line<'static>> {
    let width = (width as usize).max(1);
    let mut out: Vec<Line<'static>> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.spans.is_empty() {
            out.push(Line::from(""));
            continue;
        }
        let mut wrapper = LineWrapper::new(width);
        for span in &line.spans {
            for ch in span.content.chars() {
                wrapper.push_char(ch, span.style);
            }
        }
        wrapper.finish(&mut out);
    }

    out
}

struct LineWrapper {
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    current_width: usize,
    word: Vec<(char, Style)>,
    word_width: usize,
}

impl LineWrapper {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: Vec::new(),
            current_width: 0,
            word: Vec::new(),
            word_width: 0,
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        if ch == ' ' {
            self.flush_word();
            // A space that would sit past the edge wraps instead and is
            // swallowed, so continuation lines start flush left.
            if self.current_width < self.width {
                self.append_run(style, " ");
                self.current_width += 1;
            } else {
                self.emit_line();
            }
        } else {
            self.word.push((ch, style));
            self.word_width += ch.width().unwrap_or(0);
        }
    }

    fn flush_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        if self.current_width > 0 && self.current_width + self.word_width > self.width {
            self.emit_line();
        }
        let word = std::mem::take(&mut self.word);
        for (ch, style) in word {
            let w = ch.width().unwrap_or(0);
            if self.current_width > 0 && self.current_width + w > self.width {
                self.emit_line();
            }
            let mut buf = [0u8; 4];
            self.append_run(style, ch.encode_utf8(&mut buf));
            self.current_width += w;
        }
        self.word_width = 0;
    }

    fn append_run(&mut self, style: Style, text: &str) {
        if let Some(last) = self.current.last_mut() {
            if last.style == style {
                let mut content = last.content.to_string();
                content.push_str(text);
                *last = Span::styled(content, style);
                return;
            }
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn emit_line(&mut self) {
        let mut spans = std::mem::take(&mut self.current);
        // Trailing spaces at a wrap point are layout, not content.
        while let Some(last) = spans.last_mut() {
            let trimmed = last.content.trim_end_matches(' ');
            if trimmed.len() == last.content.len() {
                break;
            }
            if trimmed.is_empty() {
                spans.pop();
            } else {
                *last = Span::styled(trimmed.to_string(), last.style);
                break;
            }
        }
        self.lines.push(Line::from(spans));
        self.current_width = 0;
    }

    fn finish(mut self, out: &mut Vec<Line<'static>>) {
        self.flush_word();
        let emitted_any = !self.lines.is_empty();
        if !self.current.is_empty() {
            self.emit_line();
        } else if !emitted_any {
            // Whitespace-only input still takes one visual line.
            self.lines.push(Line::from(""));
        }
        out.append(&mut self.lines);
    }
}

/// Transcript viewport position. `follow` pins the view to the newest line
/// while a response streams in; any manual upward movement releases it.
#[derive(Debug)]
pub struct ScrollState {
    pub offset: u16,
    pub follow: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl ScrollState {
    pub fn max_offset(total_lines: usize, viewport_height: u16) -> u16 {
        let total = total_lines.min(u16::MAX as usize) as u16;
        total.saturating_sub(viewport_height)
    }

    pub fn clamp(&mut self, total_lines: usize, viewport_height: u16) {
        let max = Self::max_offset(total_lines, viewport_height);
        if self.offset > max {
            self.offset = max;
        }
    }

    pub fn to_bottom(&mut self, total_lines: usize, viewport_height: u16) {
        self.offset = Self::max_offset(total_lines, viewport_height);
        self.follow = true;
    }

    /// Put `line` at the top of the viewport, clamped to the scroll range.
    pub fn to_line(&mut self, line: usize, total_lines: usize, viewport_height: u16) {
        let max = Self::max_offset(total_lines, viewport_height);
        self.offset = (line.min(u16::MAX as usize) as u16).min(max);
        self.follow = self.offset == max;
    }

    pub fn line_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
        self.follow = false;
    }

    pub fn line_down(&mut self, total_lines: usize, viewport_height: u16) {
        let max = Self::max_offset(total_lines, viewport_height);
        self.offset = self.offset.saturating_add(1).min(max);
        self.follow = self.offset == max;
    }

    pub fn page_up(&mut self, viewport_height: u16) {
        self.offset = self.offset.saturating_sub(viewport_height.max(1));
        self.follow = false;
    }

    pub fn page_down(&mut self, total_lines: usize, viewport_height: u16) {
        let max = Self::max_offset(total_lines, viewport_height);
        self.offset = self
            .offset
            .saturating_add(viewport_height.max(1))
            .min(max);
        self.follow = self.offset == max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn words_wrap_at_boundaries() {
        let wrapped = wrap_styled_lines(&[Line::from("one two three four")], 9);
        assert_eq!(texts(&wrapped), vec!["one two", "three", "four"]);
    }

    #[test]
    fn continuation_lines_never_start_with_a_space() {
        let wrapped = wrap_styled_lines(&[Line::from("aaaa bbbb cccc")], 5);
        for line in texts(&wrapped) {
            assert!(!line.starts_with(' '), "leading space in {line:?}");
        }
    }

    #[test]
    fn overlong_words_chunk_across_lines() {
        let wrapped = wrap_styled_lines(&[Line::from("abcdefghij")], 4);
        assert_eq!(texts(&wrapped), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wide_chars_count_double() {
        // Each ideograph is two cells, so only two fit in width 5.
        let wrapped = wrap_styled_lines(&[Line::from("日本語")], 5);
        assert_eq!(texts(&wrapped), vec!["日本", "語"]);
    }

    #[test]
    fn styles_survive_wrapping_and_merge() {
        let line = Line::from(vec![
            Span::styled("red", Style::default().fg(Color::Red)),
            Span::styled("red", Style::default().fg(Color::Red)),
            Span::styled(" blue", Style::default().fg(Color::Blue)),
        ]);
        let wrapped = wrap_styled_lines(&[line], 80);
        assert_eq!(wrapped.len(), 1);
        // Identical adjacent styles collapse into one span.
        assert_eq!(wrapped[0].spans.len(), 2);
        assert_eq!(wrapped[0].spans[0].content, "redred");
        assert_eq!(wrapped[0].spans[0].style.fg, Some(Color::Red));
    }

    #[test]
    fn empty_lines_are_preserved() {
        let wrapped = wrap_styled_lines(&[Line::from(""), Line::from("x"), Line::from("")], 10);
        assert_eq!(texts(&wrapped), vec!["", "x", ""]);
    }

    #[test]
    fn max_offset_basics() {
        assert_eq!(ScrollState::max_offset(10, 4), 6);
        assert_eq!(ScrollState::max_offset(3, 10), 0);
    }

    #[test]
    fn manual_scroll_releases_follow() {
        let mut scroll = ScrollState::default();
        scroll.to_bottom(30, 10);
        assert_eq!(scroll.offset, 20);
        assert!(scroll.follow);

        scroll.line_up();
        assert!(!scroll.follow);
        assert_eq!(scroll.offset, 19);

        scroll.line_down(30, 10);
        assert!(scroll.follow);
    }

    #[test]
    fn page_movement_clamps_to_range() {
        let mut scroll = ScrollState::default();
        scroll.page_up(10);
        assert_eq!(scroll.offset, 0);

        scroll.page_down(25, 10);
        assert_eq!(scroll.offset, 10);
        scroll.page_down(25, 10);
        assert_eq!(scroll.offset, 15);
        assert!(scroll.follow);
    }

    #[test]
    fn to_line_clamps_and_tracks_follow() {
        let mut scroll = ScrollState::default();
        scroll.to_line(5, 40, 10);
        assert_eq!(scroll.offset, 5);
        assert!(!scroll.follow);

        scroll.to_line(100, 40, 10);
        assert_eq!(scroll.offset, 30);
        assert!(scroll.follow);
    }
}
