use ratatui::style::{Color, Modifier, Style};

use crate::core::config::{Config, CustomTheme};

/// Resolved style set for the whole interface. Built-ins are `dark` and
/// `light`; anything else is looked up among the config's custom themes and
/// patched over the dark base.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub user_prefix: Style,
    pub user_text: Style,
    pub assistant_text: Style,
    pub system_text: Style,
    pub info_text: Style,
    pub error_text: Style,
    pub title: Style,
    pub streaming_indicator: Style,
    pub input_border: Style,
    pub input_title: Style,
    pub input_text: Style,
    pub heading: Style,
    pub inline_code: Style,
    pub code_block_text: Style,
    pub code_block_bg: Option<Color>,
    pub list_marker: Style,
    pub blockquote: Style,
    pub link: Style,
    pub rule: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Theme {
            background: Color::Rgb(16, 18, 24),
            user_prefix: Style::default()
                .fg(Color::Rgb(102, 197, 228))
                .add_modifier(Modifier::BOLD),
            user_text: Style::default().fg(Color::Rgb(102, 197, 228)),
            assistant_text: Style::default().fg(Color::Rgb(220, 223, 228)),
            system_text: Style::default()
                .fg(Color::Rgb(148, 151, 160))
                .add_modifier(Modifier::ITALIC),
            info_text: Style::default().fg(Color::Rgb(148, 151, 160)),
            error_text: Style::default().fg(Color::Rgb(224, 108, 117)),
            title: Style::default().fg(Color::Rgb(171, 178, 191)),
            streaming_indicator: Style::default().fg(Color::Rgb(229, 192, 123)),
            input_border: Style::default().fg(Color::Rgb(92, 99, 112)),
            input_title: Style::default().fg(Color::Rgb(148, 151, 160)),
            input_text: Style::default().fg(Color::Rgb(220, 223, 228)),
            heading: Style::default()
                .fg(Color::Rgb(198, 120, 221))
                .add_modifier(Modifier::BOLD),
            inline_code: Style::default()
                .fg(Color::Rgb(152, 195, 121))
                .bg(Color::Rgb(40, 44, 52)),
            code_block_text: Style::default().fg(Color::Rgb(171, 178, 191)),
            code_block_bg: Some(Color::Rgb(30, 34, 42)),
            list_marker: Style::default().fg(Color::Rgb(97, 175, 239)),
            blockquote: Style::default()
                .fg(Color::Rgb(148, 151, 160))
                .add_modifier(Modifier::ITALIC),
            link: Style::default()
                .fg(Color::Rgb(97, 175, 239))
                .add_modifier(Modifier::UNDERLINED),
            rule: Style::default().fg(Color::Rgb(92, 99, 112)),
        }
    }

    pub fn light() -> Self {
        Theme {
            background: Color::Rgb(250, 250, 248),
            user_prefix: Style::default()
                .fg(Color::Rgb(1, 84, 153))
                .add_modifier(Modifier::BOLD),
            user_text: Style::default().fg(Color::Rgb(1, 84, 153)),
            assistant_text: Style::default().fg(Color::Rgb(36, 41, 46)),
            system_text: Style::default()
                .fg(Color::Rgb(106, 115, 125))
                .add_modifier(Modifier::ITALIC),
            info_text: Style::default().fg(Color::Rgb(106, 115, 125)),
            error_text: Style::default().fg(Color::Rgb(179, 29, 40)),
            title: Style::default().fg(Color::Rgb(68, 77, 86)),
            streaming_indicator: Style::default().fg(Color::Rgb(176, 136, 0)),
            input_border: Style::default().fg(Color::Rgb(149, 157, 165)),
            input_title: Style::default().fg(Color::Rgb(106, 115, 125)),
            input_text: Style::default().fg(Color::Rgb(36, 41, 46)),
            heading: Style::default()
                .fg(Color::Rgb(111, 66, 193))
                .add_modifier(Modifier::BOLD),
            inline_code: Style::default()
                .fg(Color::Rgb(34, 134, 58))
                .bg(Color::Rgb(240, 240, 236)),
            code_block_text: Style::default().fg(Color::Rgb(36, 41, 46)),
            code_block_bg: Some(Color::Rgb(240, 240, 236)),
            list_marker: Style::default().fg(Color::Rgb(3, 102, 214)),
            blockquote: Style::default()
                .fg(Color::Rgb(106, 115, 125))
                .add_modifier(Modifier::ITALIC),
            link: Style::default()
                .fg(Color::Rgb(3, 102, 214))
                .add_modifier(Modifier::UNDERLINED),
            rule: Style::default().fg(Color::Rgb(149, 157, 165)),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Look the name up among the config's custom themes first, then the
    /// built-ins. Unknown names fall back to dark.
    pub fn resolve(name: &str, config: &Config) -> Self {
        match config.get_custom_theme(name) {
            Some(custom) => Self::from_custom(custom),
            None => Self::from_name(name),
        }
    }

    /// A custom theme patches the dark base; unset fields keep the base
    /// style. Markdown accents are not individually customizable.
    pub fn from_custom(custom: &CustomTheme) -> Self {
        let mut theme = Self::dark();
        if let Some(color) = custom.background.as_deref().and_then(parse_color) {
            theme.background = color;
        }
        patch(&mut theme.user_prefix, &custom.user_prefix);
        patch(&mut theme.user_text, &custom.user_text);
        patch(&mut theme.assistant_text, &custom.assistant_text);
        patch(&mut theme.system_text, &custom.system_text);
        patch(&mut theme.info_text, &custom.info_text);
        patch(&mut theme.error_text, &custom.error_text);
        patch(&mut theme.title, &custom.title);
        patch(&mut theme.streaming_indicator, &custom.streaming_indicator);
        patch(&mut theme.input_border, &custom.input_border);
        patch(&mut theme.input_title, &custom.input_title);
        patch(&mut theme.input_text, &custom.input_text);
        theme
    }

    /// Brightness heuristic used to pick a matching syntect palette.
    pub fn has_dark_background(&self) -> bool {
        match self.background {
            Color::Rgb(r, g, b) => {
                let luma = 0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b);
                luma < 128.0
            }
            Color::White => false,
            _ => true,
        }
    }
}

fn patch(target: &mut Style, spec: &Option<String>) {
    if spec.is_some() {
        *target = parse_style(spec);
    }
}

/// Style spec: comma-separated tokens, each either a color (the first one
/// wins as foreground) or a modifier name.
pub(crate) fn parse_style(spec: &Option<String>) -> Style {
    let mut style = Style::default();
    let Some(spec) = spec else {
        return style;
    };
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(color) = parse_color(token) {
            if style.fg.is_none() {
                style = style.fg(color);
            }
            continue;
        }
        match token.to_ascii_lowercase().as_str() {
            "bold" => style = style.add_modifier(Modifier::BOLD),
            "italic" => style = style.add_modifier(Modifier::ITALIC),
            "underlined" | "underline" => style = style.add_modifier(Modifier::UNDERLINED),
            "dim" => style = style.add_modifier(Modifier::DIM),
            "reversed" => style = style.add_modifier(Modifier::REVERSED),
            _ => {}
        }
    }
    style
}

/// Accepts `#rgb`, `#rrggbb`, `rgb(r,g,b)`, and a small set of names.
pub(crate) fn parse_color(token: &str) -> Option<Color> {
    let lower = token.trim().to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(inner) = lower.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let parts: Vec<&str> = inner
            .split([',', ' '])
            .filter(|t| !t.is_empty())
            .collect();
        if parts.len() != 3 {
            return None;
        }
        let r: u16 = parts[0].parse().ok()?;
        let g: u16 = parts[1].parse().ok()?;
        let b: u16 = parts[2].parse().ok()?;
        return Some(Color::Rgb(
            r.min(255) as u8,
            g.min(255) as u8,
            b.min(255) as u8,
        ));
    }
    match lower.as_str() {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "dark-gray" | "darkgrey" => Some(Color::DarkGray),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "lightred" | "light-red" => Some(Color::LightRed),
        "lightgreen" | "light-green" => Some(Color::LightGreen),
        "lightyellow" | "light-yellow" => Some(Color::LightYellow),
        "lightblue" | "light-blue" => Some(Color::LightBlue),
        "lightmagenta" | "light-magenta" => Some(Color::LightMagenta),
        "lightcyan" | "light-cyan" => Some(Color::LightCyan),
        "reset" => Some(Color::Reset),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
            Some(Color::Rgb(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}
