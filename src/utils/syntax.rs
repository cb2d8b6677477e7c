use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::ui::theme::Theme;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

const CACHE_CAP: usize = 64;

// Highlighting the same block on every frame of a stream would dominate
// render time, so finished results are cached by (lang, content, palette).
struct HighlightCache {
    map: HashMap<u64, Vec<Line<'static>>>,
    order: VecDeque<u64>,
}

impl HighlightCache {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: u64) -> Option<Vec<Line<'static>>> {
        self.map.get(&key).cloned()
    }

    fn put(&mut self, key: u64, value: Vec<Line<'static>>) {
        if self.map.insert(key, value).is_none() {
            self.order.push_back(key);
        }
        while self.map.len() > CACHE_CAP {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

static CACHE: Mutex<Option<HighlightCache>> = Mutex::new(None);

fn cache_key(lang: &str, code: &str, palette: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    palette.hash(&mut hasher);
    hasher.finish()
}

fn normalize_lang(hint: &str) -> String {
    let t = hint.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" => "python".into(),
        "sh" | "zsh" | "shell" => "bash".into(),
        "js" | "jsx" => "javascript".into(),
        "ts" | "tsx" => "typescript".into(),
        "yml" => "yaml".into(),
        "rs" => "rust".into(),
        "h" => "c".into(),
        "cc" | "cxx" | "hpp" | "hxx" => "cpp".into(),
        "kt" => "kotlin".into(),
        other => other.into(),
    }
}

fn palette_for(theme: &Theme) -> &'static str {
    if theme.has_dark_background() {
        "base16-ocean.dark"
    } else {
        "InspiredGitHub"
    }
}

/// Highlight a fenced code block into styled lines, background included.
/// Returns `None` when syntect cannot produce output; callers then render
/// the block with the theme's plain code style.
pub fn highlight_code_block(lang_hint: &str, code: &str, theme: &Theme) -> Option<Vec<Line<'static>>> {
    let syntaxes = SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines);
    let themes = THEME_SET.get_or_init(ThemeSet::load_defaults);

    let lang = normalize_lang(lang_hint);
    let palette = palette_for(theme);
    let syn_theme = themes
        .themes
        .get(palette)
        .or_else(|| themes.themes.values().next())?;

    let key = cache_key(&lang, code, palette);
    {
        let mut guard = CACHE.lock().ok()?;
        if let Some(lines) = guard.get_or_insert_with(HighlightCache::new).get(key) {
            return Some(lines);
        }
    }

    let syntax = syntaxes
        .find_syntax_by_token(&lang)
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, syn_theme);

    let mut out: Vec<Line<'static>> = Vec::new();
    for line in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(line, syntaxes).ok()?;
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (style, text) in ranges {
            let fragment = text.strip_suffix('\n').unwrap_or(text);
            if fragment.is_empty() {
                continue;
            }
            let mut st = Style::default().fg(Color::Rgb(
                style.foreground.r,
                style.foreground.g,
                style.foreground.b,
            ));
            if let Some(bg) = theme.code_block_bg {
                st = st.bg(bg);
            }
            spans.push(Span::styled(fragment.to_string(), st));
        }
        if spans.is_empty() {
            out.push(Line::from(""));
        } else {
            out.push(Line::from(spans));
        }
    }

    if let Ok(mut guard) = CACHE.lock() {
        guard
            .get_or_insert_with(HighlightCache::new)
            .put(key, out.clone());
    }
    Some(out)
}
