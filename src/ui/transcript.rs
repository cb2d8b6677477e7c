use ratatui::text::{Line, Span};

use crate::core::message::{Message, Role};
use crate::core::session::{DraftState, SessionContext, TranscriptCell};
use crate::ui::markdown::{render_markdown, render_plain};
use crate::ui::theme::Theme;
use crate::utils::scroll::wrap_styled_lines;

const USER_PREFIX: &str = "You: ";
const USER_INDENT: &str = "     ";
const DRAFT_CURSOR: &str = "▍";

#[derive(Debug, Clone, Copy)]
pub struct RenderFlags {
    pub markdown: bool,
    pub syntax: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            markdown: true,
            syntax: true,
        }
    }
}

/// Width-wrapped lines for the whole conversation plus the visual range each
/// transcript cell occupies. Ranges are what scroll-to-message and the
/// draft's auto-follow anchor against.
pub struct TranscriptLayout {
    pub lines: Vec<Line<'static>>,
    pub cell_ranges: Vec<(usize, usize)>,
}

impl TranscriptLayout {
    /// First visual line of the given transcript cell.
    pub fn cell_start(&self, cell: usize) -> Option<usize> {
        self.cell_ranges.get(cell).map(|(start, _)| *start)
    }
}

pub fn build_transcript(
    session: &SessionContext,
    theme: &Theme,
    flags: RenderFlags,
    width: u16,
) -> TranscriptLayout {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut cell_ranges: Vec<(usize, usize)> = Vec::with_capacity(session.transcript.len());

    for cell in &session.transcript {
        let rendered = match cell {
            TranscriptCell::Committed { message, .. } | TranscriptCell::Preview(message) => {
                render_message(message, theme, flags)
            }
            TranscriptCell::Notice(message) => render_message(message, theme, flags),
            TranscriptCell::Draft => render_draft(session, theme, flags),
        };
        let mut wrapped = wrap_styled_lines(&rendered, width);
        // One blank line of spacing after every cell.
        wrapped.push(Line::from(""));
        let start = lines.len();
        cell_ranges.push((start, wrapped.len()));
        lines.append(&mut wrapped);
    }

    TranscriptLayout { lines, cell_ranges }
}

fn render_message(message: &Message, theme: &Theme, flags: RenderFlags) -> Vec<Line<'static>> {
    match message.role {
        Role::User => render_user(message, theme),
        Role::Assistant => {
            if flags.markdown {
                render_markdown(
                    &message.content,
                    theme.assistant_text,
                    theme,
                    flags.syntax,
                )
            } else {
                render_plain(&message.content, theme.assistant_text)
            }
        }
        Role::System => render_plain(&message.content, theme.system_text),
        Role::AppInfo => render_plain(&message.content, theme.info_text),
        Role::AppError => render_plain(&message.content, theme.error_text),
    }
}

fn render_user(message: &Message, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for (i, raw) in message.content.lines().enumerate() {
        if i == 0 {
            lines.push(Line::from(vec![
                Span::styled(USER_PREFIX.to_string(), theme.user_prefix),
                Span::styled(raw.to_string(), theme.user_text),
            ]));
        } else if raw.is_empty() {
            lines.push(Line::from(""));
        } else {
            lines.push(Line::from(vec![
                Span::raw(USER_INDENT.to_string()),
                Span::styled(raw.to_string(), theme.user_text),
            ]));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            USER_PREFIX.to_string(),
            theme.user_prefix,
        )));
    }
    if let Some(images) = &message.images {
        if !images.is_empty() {
            let label = if images.len() == 1 {
                "[1 image attached]".to_string()
            } else {
                format!("[{} images attached]", images.len())
            };
            lines.push(Line::from(Span::styled(label, theme.info_text)));
        }
    }
    lines
}

/// The draft renders from its full accumulated content on every pass, with a
/// cursor glyph marking the stream as live.
fn render_draft(session: &SessionContext, theme: &Theme, flags: RenderFlags) -> Vec<Line<'static>> {
    let content = match &session.draft {
        DraftState::Drafting(draft) => draft.content.as_str(),
        DraftState::NoDraft => "",
    };
    let mut lines = if content.is_empty() {
        Vec::new()
    } else if flags.markdown {
        render_markdown(content, theme.assistant_text, theme, flags.syntax)
    } else {
        render_plain(content, theme.assistant_text)
    };

    let cursor = Span::styled(DRAFT_CURSOR.to_string(), theme.streaming_indicator);
    match lines.last_mut() {
        Some(last) => last.spans.push(cursor),
        None => lines.push(Line::from(cursor)),
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::Chat;
    use crate::core::reconcile::StreamOutcome;
    use crate::api::StreamRecord;
    use crate::core::chat_stream::StreamEvent;

    fn session_with(messages: Vec<Message>) -> SessionContext {
        let mut chat = Chat::new("llama3");
        chat.history = messages;
        SessionContext::new(chat)
    }

    fn flags() -> RenderFlags {
        RenderFlags {
            markdown: true,
            syntax: false,
        }
    }

    fn texts(layout: &TranscriptLayout) -> Vec<String> {
        layout.lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn user_messages_get_prefix_and_indent() {
        let session = session_with(vec![Message::user("first line\nsecond line")]);
        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        let rendered = texts(&layout);
        assert_eq!(rendered[0], "You: first line");
        assert_eq!(rendered[1], "     second line");
        assert_eq!(rendered[2], "");
    }

    #[test]
    fn assistant_markdown_is_rendered() {
        let session = session_with(vec![Message::assistant("# Title\n\nbody")]);
        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        let rendered = texts(&layout);
        assert_eq!(rendered[0], "Title");
        assert!(rendered.contains(&"body".to_string()));
    }

    #[test]
    fn cell_ranges_tile_the_line_list() {
        let session = session_with(vec![
            Message::user("hi"),
            Message::assistant("hello\n\nthere"),
            Message::user("more"),
        ]);
        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);

        let mut expected_start = 0;
        for &(start, len) in &layout.cell_ranges {
            assert_eq!(start, expected_start);
            expected_start = start + len;
        }
        assert_eq!(expected_start, layout.lines.len());
    }

    #[test]
    fn notices_use_their_role_styles() {
        let mut session = session_with(vec![]);
        session.push_notice(Message::info("saved"));
        session.push_notice(Message::error("boom"));
        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        let rendered = texts(&layout);
        assert_eq!(rendered[0], "saved");
        assert_eq!(rendered[2], "Error: boom");
        assert_eq!(layout.lines[0].spans[0].style, theme.info_text);
        assert_eq!(layout.lines[2].spans[0].style, theme.error_text);
    }

    #[test]
    fn draft_renders_accumulated_content_with_cursor() {
        let mut session = session_with(vec![Message::user("hi")]);
        let (id, _) = session.begin_stream();
        let outcome = session.apply_stream_event(StreamEvent::Record(StreamRecord {
            content: Some("partial answer".to_string()),
            done: false,
            error: None,
        }));
        assert!(!outcome.stream_ended);
        assert_eq!(session.current_stream_id, id);

        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        let rendered = texts(&layout);
        assert!(rendered
            .iter()
            .any(|l| l.contains("partial answer") && l.contains(DRAFT_CURSOR)));
    }

    #[test]
    fn empty_draft_shows_only_the_cursor() {
        let mut session = session_with(vec![Message::user("hi")]);
        session.begin_stream();
        let _ = session.apply_stream_event(StreamEvent::Record(StreamRecord {
            content: Some(String::new()),
            done: false,
            error: None,
        }));

        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        let draft_cell = session
            .transcript
            .iter()
            .position(|c| matches!(c, TranscriptCell::Draft))
            .unwrap();
        let start = layout.cell_start(draft_cell).unwrap();
        assert_eq!(layout.lines[start].to_string(), DRAFT_CURSOR);
    }

    #[test]
    fn narrow_width_wraps_message_lines() {
        let session = session_with(vec![Message::assistant(
            "a reasonably long sentence that will not fit",
        )]);
        let theme = Theme::dark();
        let wide = build_transcript(&session, &theme, flags(), 200);
        let narrow = build_transcript(&session, &theme, flags(), 12);
        assert!(narrow.lines.len() > wide.lines.len());
    }

    #[test]
    fn committed_outcome_keeps_ranges_valid() {
        let mut session = session_with(vec![Message::user("q")]);
        session.begin_stream();
        let _ = session.apply_stream_event(StreamEvent::Record(StreamRecord {
            content: Some("answer".to_string()),
            done: false,
            error: None,
        }));
        let outcome: StreamOutcome = session.apply_stream_event(StreamEvent::Record(StreamRecord {
            content: None,
            done: true,
            error: None,
        }));
        assert!(outcome.stream_ended);

        let theme = Theme::dark();
        let layout = build_transcript(&session, &theme, flags(), 80);
        assert_eq!(layout.cell_ranges.len(), session.transcript.len());
        assert!(texts(&layout).contains(&"answer".to_string()));
    }
}
