use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const SEPARATOR: &str = " • ";

/// Everything the header line can show. Optional fields are dropped or
/// truncated when the terminal is too narrow; the base (app name, provider,
/// model) always stays.
pub struct HeaderFields {
    pub title: String,
    pub model: String,
    pub provider: Option<String>,
    pub persona: Option<String>,
    pub dirty: bool,
    pub temporary: bool,
    pub elapsed: Option<Duration>,
    pub logging: Option<String>,
}

#[derive(Debug, Clone)]
struct FieldVariant {
    text: String,
    width: usize,
}

impl FieldVariant {
    fn new(text: String) -> Self {
        let width = UnicodeWidthStr::width(text.as_str());
        Self { text, width }
    }
}

/// Full text first, then grapheme-truncated forms down to three graphemes.
fn build_variants(label: &str, value: &str) -> Vec<FieldVariant> {
    let mut variants = Vec::new();
    variants.push(FieldVariant::new(format!("{}{}", label, value)));

    let graphemes: Vec<&str> = UnicodeSegmentation::graphemes(value, true).collect();
    if graphemes.len() > 3 {
        for keep in (3..graphemes.len()).rev() {
            let mut truncated = graphemes[..keep].concat();
            truncated.push('…');
            let text = format!("{}{}", label, truncated);
            if variants
                .last()
                .map(|variant| variant.text == text)
                .unwrap_or(false)
            {
                continue;
            }
            variants.push(FieldVariant::new(text));
        }
    }

    variants
}

fn total_width(widths: &[usize], separator_width: usize) -> usize {
    let sum: usize = widths.iter().sum();
    sum + widths.len().saturating_sub(1) * separator_width
}

fn assemble(
    base: &str,
    title: &FieldVariant,
    persona: Option<&FieldVariant>,
    tail: &[FieldVariant],
) -> String {
    let mut parts: Vec<&str> = vec![base, title.text.as_str()];
    if let Some(persona) = persona {
        parts.push(persona.text.as_str());
    }
    for field in tail {
        parts.push(field.text.as_str());
    }
    parts.join(SEPARATOR)
}

pub fn build_header(fields: &HeaderFields, available_width: u16) -> String {
    let available_width = available_width as usize;
    let separator_width = UnicodeWidthStr::width(SEPARATOR);

    let marker = if fields.temporary {
        "[temp] "
    } else if fields.dirty {
        "* "
    } else {
        ""
    };
    let model_display = if fields.model.is_empty() {
        "no model selected"
    } else {
        fields.model.as_str()
    };
    let base_text = match &fields.provider {
        Some(provider) => format!(
            "{}chatbowl v{} - {} ({})",
            marker,
            env!("CARGO_PKG_VERSION"),
            provider,
            model_display
        ),
        None => format!(
            "{}chatbowl v{} ({})",
            marker,
            env!("CARGO_PKG_VERSION"),
            model_display
        ),
    };
    let base_width = UnicodeWidthStr::width(base_text.as_str());

    let title_variants = build_variants("", &fields.title);
    let persona_variants = fields
        .persona
        .as_ref()
        .map(|name| build_variants("Persona: ", name));

    let mut tail: Vec<FieldVariant> = Vec::new();
    if let Some(elapsed) = fields.elapsed {
        tail.push(FieldVariant::new(format!(
            "{:.1}s",
            elapsed.as_secs_f64()
        )));
    }
    if let Some(logging) = &fields.logging {
        tail.push(FieldVariant::new(format!("Logging: {}", logging)));
    }
    let tail_widths: Vec<usize> = tail.iter().map(|f| f.width).collect();

    let fits = |title: &FieldVariant, persona: Option<&FieldVariant>| {
        let mut widths = vec![base_width, title.width];
        if let Some(persona) = persona {
            widths.push(persona.width);
        }
        widths.extend_from_slice(&tail_widths);
        total_width(&widths, separator_width) <= available_width
    };

    // Keep the longest title that fits; within that, keep as much of the
    // persona as possible, dropping it entirely before shortening the title.
    for title in &title_variants {
        if let Some(personas) = &persona_variants {
            if let Some(persona) = personas.iter().find(|&p| fits(title, Some(p))) {
                return assemble(&base_text, title, Some(persona), &tail);
            }
        }
        if fits(title, None) {
            return assemble(&base_text, title, None, &tail);
        }
    }

    let shortest = title_variants
        .last()
        .cloned()
        .unwrap_or_else(|| FieldVariant::new(fields.title.clone()));
    assemble(&base_text, &shortest, None, &tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> HeaderFields {
        HeaderFields {
            title: "Capital of France".to_string(),
            model: "llama3".to_string(),
            provider: None,
            persona: None,
            dirty: false,
            temporary: false,
            elapsed: None,
            logging: None,
        }
    }

    #[test]
    fn wide_terminal_shows_everything() {
        let mut f = fields();
        f.provider = Some("Groq".to_string());
        f.persona = Some("Friendly".to_string());
        f.logging = Some("active (chat.log)".to_string());
        let header = build_header(&f, 200);
        let expected = format!(
            "chatbowl v{} - Groq (llama3) • Capital of France • Persona: Friendly • Logging: active (chat.log)",
            env!("CARGO_PKG_VERSION")
        );
        assert_eq!(header, expected);
    }

    #[test]
    fn persona_is_dropped_before_the_title_shrinks() {
        let mut f = fields();
        f.persona = Some("Conversationalist".to_string());
        let without_persona = build_header(&fields(), 200);
        let width = UnicodeWidthStr::width(without_persona.as_str()) as u16;

        let header = build_header(&f, width);
        assert_eq!(header, without_persona);
        assert!(header.contains("Capital of France"));
        assert!(!header.contains("Persona"));
    }

    #[test]
    fn narrow_terminal_truncates_the_title() {
        let header = build_header(&fields(), 40);
        assert!(header.contains('…'));
        assert!(UnicodeWidthStr::width(header.as_str()) <= 40);
    }

    #[test]
    fn markers_reflect_chat_state() {
        let mut f = fields();
        f.dirty = true;
        assert!(build_header(&f, 200).starts_with("* chatbowl"));

        f.temporary = true;
        assert!(build_header(&f, 200).starts_with("[temp] chatbowl"));
    }

    #[test]
    fn elapsed_renders_with_one_decimal() {
        let mut f = fields();
        f.elapsed = Some(Duration::from_millis(1540));
        let header = build_header(&f, 200);
        assert!(header.ends_with(" • 1.5s"));
    }

    #[test]
    fn empty_model_gets_a_placeholder() {
        let mut f = fields();
        f.model = String::new();
        assert!(build_header(&f, 200).contains("(no model selected)"));
    }
}
