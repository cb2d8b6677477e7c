//! The interactive event loop: draw, poll terminal input, drain stream
//! events and finished command round-trips. Single-threaded and cooperative;
//! all backend I/O happens on spawned tasks and arrives here over channels.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use crate::commands::{self, ActionOutcome, CommandResult};
use crate::core::app::App;
use crate::core::chat_stream::StreamEvent;
use crate::ui::header::{build_header, HeaderFields};
use crate::ui::transcript::{build_transcript, RenderFlags};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MOUSE_SCROLL_LINES: u16 = 3;

/// Visual metrics of the last frame, needed by scroll handling between draws.
#[derive(Default, Clone, Copy)]
struct ViewMetrics {
    total_lines: usize,
    viewport_height: u16,
}

pub async fn run_chat(
    mut app: App,
    mut rx: mpsc::UnboundedReceiver<(StreamEvent, u64)>,
) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut app, &mut rx, &mut terminal).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<(StreamEvent, u64)>,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), Box<dyn Error>> {
    app.bootstrap().await;
    app.notify("Type a message, or /help for commands.");

    // Backend round-trips staged by slash commands report back here so the
    // loop keeps drawing while they run.
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<ActionOutcome>();
    let mut metrics = ViewMetrics::default();

    loop {
        terminal.draw(|frame| {
            metrics = draw_frame(frame, app);
        })?;

        if app.exit_requested {
            return Ok(());
        }

        // The 50ms timeout doubles as the response-timer tick while streaming.
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(app, key, metrics, &action_tx)? {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll.follow = false;
                        for _ in 0..MOUSE_SCROLL_LINES {
                            app.scroll.line_up();
                        }
                    }
                    MouseEventKind::ScrollDown => {
                        for _ in 0..MOUSE_SCROLL_LINES {
                            app.scroll
                                .line_down(metrics.total_lines, metrics.viewport_height);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Drain everything the stream tasks produced since the last frame.
        // Stale ids are dropped inside on_stream_event.
        while let Ok((stream_event, stream_id)) = rx.try_recv() {
            let outcome = app.on_stream_event(stream_event, stream_id);
            if outcome.scroll_to_latest {
                app.scroll.follow = true;
            }
        }

        while let Ok(outcome) = action_rx.try_recv() {
            commands::apply_action_outcome(app, outcome);
        }
    }
}

/// Returns true when the loop should exit.
fn handle_key(
    app: &mut App,
    key: KeyEvent,
    metrics: ViewMetrics,
    action_tx: &mpsc::UnboundedSender<ActionOutcome>,
) -> Result<bool, Box<dyn Error>> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Ok(true);
        }
        KeyCode::Esc => {
            if app.session.is_streaming {
                app.session.interrupt_stream();
            } else {
                app.clear_input();
            }
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.textarea.insert_newline();
        }
        KeyCode::Enter => {
            let text = app.input_text();
            if text.trim().is_empty() {
                return Ok(false);
            }
            app.clear_input();
            match commands::process_input(app, &text) {
                CommandResult::Continue => {}
                CommandResult::ProcessAsMessage(message) => app.submit_prompt(message),
                CommandResult::Exit => return Ok(true),
                CommandResult::Async(action) => {
                    commands::dispatch_async_action(app, action, action_tx)
                }
            }
        }
        KeyCode::PageUp => {
            app.scroll.follow = false;
            app.scroll.page_up(metrics.viewport_height);
        }
        KeyCode::PageDown => {
            app.scroll
                .page_down(metrics.total_lines, metrics.viewport_height);
        }
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll.follow = false;
            app.scroll.line_up();
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll
                .line_down(metrics.total_lines, metrics.viewport_height);
        }
        _ => {
            app.textarea.input(tui_textarea::Input::from(key));
        }
    }
    Ok(false)
}

fn draw_frame(frame: &mut Frame, app: &mut App) -> ViewMetrics {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.background)),
        area,
    );

    let input_height = input_height(app.textarea.lines().len());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    // Header: rebuilt every frame, which is what keeps the model name, the
    // unsaved marker, and the elapsed timer current after each commit.
    let header = build_header(
        &HeaderFields {
            title: app.session.chat.display_title(),
            model: app.session.chat.model.clone(),
            provider: app.providers.current_id().map(str::to_string),
            persona: app
                .personas
                .active_id()
                .map(|_| app.personas.active_display()),
            dirty: app.session.dirty,
            temporary: app.session.chat.temporary,
            elapsed: app.session.response_elapsed(),
            logging: app.log.is_active().then(|| app.log.status()),
        },
        chunks[0].width,
    );
    frame.render_widget(
        Paragraph::new(Line::styled(header, app.theme.title)),
        chunks[0],
    );

    let flags = RenderFlags {
        markdown: app.markdown_enabled,
        syntax: app.syntax_enabled,
    };
    let layout = build_transcript(&app.session, &app.theme, flags, chunks[1].width);
    let total_lines = layout.lines.len();
    let viewport_height = chunks[1].height;
    if app.scroll.follow {
        app.scroll.to_bottom(total_lines, viewport_height);
    } else {
        app.scroll.clamp(total_lines, viewport_height);
    }
    frame.render_widget(
        Paragraph::new(layout.lines).scroll((app.scroll.offset, 0)),
        chunks[1],
    );

    let input_title = if app.session.is_streaming {
        " Streaming… (Esc to stop) "
    } else {
        " Message (Enter to send, Alt+Enter for newline) "
    };
    app.textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.input_border)
            .title(Line::styled(input_title, app.theme.input_title)),
    );
    frame.render_widget(&app.textarea, chunks[2]);

    ViewMetrics {
        total_lines,
        viewport_height,
    }
}

/// Grow the input box with its content, within reason.
fn input_height(lines: usize) -> u16 {
    (lines.clamp(1, 6) as u16) + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::LaunchOptions;
    use crate::core::config::Config;
    use crate::core::session::TranscriptCell;

    #[test]
    fn input_box_grows_with_content_up_to_a_cap() {
        assert_eq!(input_height(0), 3);
        assert_eq!(input_height(1), 3);
        assert_eq!(input_height(4), 6);
        assert_eq!(input_height(40), 8);
    }

    #[tokio::test]
    async fn enter_routes_commands_and_messages() {
        let (mut app, _rx) = App::new(
            Config::default(),
            LaunchOptions {
                model: Some("llama3".to_string()),
                ..Default::default()
            },
        );
        let metrics = ViewMetrics::default();

        let (tx, _action_rx) = mpsc::unbounded_channel();

        app.set_input_text("/clear");
        let key = KeyEvent::from(KeyCode::Enter);
        assert!(!handle_key(&mut app, key, metrics, &tx).unwrap());
        assert!(app.input_text().is_empty());
        assert!(app
            .session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Notice(m) if m.content == "History cleared.")));

        app.set_input_text("hello model");
        assert!(!handle_key(&mut app, key, metrics, &tx).unwrap());
        assert_eq!(app.session.chat.history.len(), 1);
        assert!(app.session.chat.history[0].is_user());
        assert!(app.session.is_streaming);
    }

    #[tokio::test]
    async fn quit_paths_end_the_loop() {
        let (mut app, _rx) = App::new(Config::default(), LaunchOptions::default());
        let metrics = ViewMetrics::default();

        let (tx, _action_rx) = mpsc::unbounded_channel();

        app.set_input_text("/quit");
        assert!(handle_key(&mut app, KeyEvent::from(KeyCode::Enter), metrics, &tx).unwrap());

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(handle_key(&mut app, ctrl_c, metrics, &tx).unwrap());
    }

    #[tokio::test]
    async fn esc_stops_a_stream_but_otherwise_clears_input() {
        let (mut app, _rx) = App::new(
            Config::default(),
            LaunchOptions {
                model: Some("llama3".to_string()),
                ..Default::default()
            },
        );
        let metrics = ViewMetrics::default();
        let (tx, _action_rx) = mpsc::unbounded_channel();
        let esc = KeyEvent::from(KeyCode::Esc);

        app.set_input_text("draft text");
        assert!(!handle_key(&mut app, esc, metrics, &tx).unwrap());
        assert!(app.input_text().is_empty());

        app.session.begin_stream();
        assert!(!handle_key(&mut app, esc, metrics, &tx).unwrap());
        assert!(!app.session.is_streaming);
    }

    #[tokio::test]
    async fn plain_keys_feed_the_textarea() {
        let (mut app, _rx) = App::new(Config::default(), LaunchOptions::default());
        let metrics = ViewMetrics::default();

        let (tx, _action_rx) = mpsc::unbounded_channel();

        for c in ['h', 'i'] {
            let key = KeyEvent::from(KeyCode::Char(c));
            handle_key(&mut app, key, metrics, &tx).unwrap();
        }
        assert_eq!(app.input_text(), "hi");

        let alt_enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT);
        handle_key(&mut app, alt_enter, metrics, &tx).unwrap();
        let key = KeyEvent::from(KeyCode::Char('!'));
        handle_key(&mut app, key, metrics, &tx).unwrap();
        assert_eq!(app.input_text(), "hi\n!");
    }
}
