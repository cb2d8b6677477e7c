use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::chat::Chat;
use crate::core::message::Message;

/// What the conversation view renders, in display order. Committed cells
/// carry the history index that copy / read-aloud / bookmark bind to; notices
/// and previews exist only on the display surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptCell {
    Committed {
        message: Message,
        history_index: usize,
    },
    Notice(Message),
    /// The one in-progress draft surface; content lives in the session's
    /// draft state.
    Draft,
    /// Display-only entry: regeneration tails rendered ahead of their
    /// authoritative splice, or an abandoned draft left visible.
    Preview(Message),
}

/// Accumulated assistant output that has not reached authoritative history
/// yet. `cell` is the transcript position of its display surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftResponse {
    pub content: String,
    pub cell: usize,
}

/// Exactly two states per stream session. Entered on the first record of a
/// stream (even a done-only one) and left on commit.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DraftState {
    #[default]
    NoDraft,
    Drafting(DraftResponse),
}

/// How the live stream reconciles with history. Regeneration carries the tail
/// entries that followed the regenerated turn; they are spliced back at
/// commit time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StreamMode {
    #[default]
    Normal,
    Regeneration {
        tail: Vec<Message>,
    },
}

/// Per-conversation state shared by the commands, the renderer, and the
/// stream reconciler. One of these exists per running app.
pub struct SessionContext {
    pub chat: Chat,
    pub transcript: Vec<TranscriptCell>,
    pub draft: DraftState,
    pub mode: StreamMode,
    pub current_stream_id: u64,
    pub stream_cancel_token: Option<CancellationToken>,
    pub is_streaming: bool,
    stream_started: Option<Instant>,
    last_elapsed: Option<Duration>,
    /// Unsaved changes since the last store write; drives the header marker.
    pub dirty: bool,
}

impl SessionContext {
    pub fn new(chat: Chat) -> Self {
        let mut session = Self {
            chat,
            transcript: Vec::new(),
            draft: DraftState::NoDraft,
            mode: StreamMode::Normal,
            current_stream_id: 0,
            stream_cancel_token: None,
            is_streaming: false,
            stream_started: None,
            last_elapsed: None,
            dirty: false,
        };
        session.rebuild_transcript();
        session
    }

    /// Re-derive the display surface from authoritative history. Drops
    /// notices and previews; a live draft keeps its surface at the end (with
    /// any regeneration tail re-rendered below it) and its cell index is
    /// refreshed, so history edits mid-stream cannot orphan the draft.
    pub fn rebuild_transcript(&mut self) {
        self.transcript = self
            .chat
            .history
            .iter()
            .cloned()
            .enumerate()
            .map(|(history_index, message)| TranscriptCell::Committed {
                message,
                history_index,
            })
            .collect();
        if let DraftState::Drafting(draft) = &mut self.draft {
            draft.cell = self.transcript.len();
            self.transcript.push(TranscriptCell::Draft);
            if let StreamMode::Regeneration { tail } = &self.mode {
                for entry in tail.clone() {
                    self.transcript.push(TranscriptCell::Preview(entry));
                }
            }
        }
    }

    pub fn push_notice(&mut self, message: Message) -> usize {
        self.transcript.push(TranscriptCell::Notice(message));
        self.transcript.len() - 1
    }

    /// Append a wire-role entry to history and its cell to the display.
    pub fn push_history(&mut self, message: Message) -> usize {
        self.chat.history.push(message.clone());
        let history_index = self.chat.history.len() - 1;
        self.transcript.push(TranscriptCell::Committed {
            message,
            history_index,
        });
        self.dirty = true;
        history_index
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        stream_id == self.current_stream_id
    }

    pub fn cancel_current_stream(&mut self) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
    }

    /// Cancel whatever was in flight and open a new stream session. Returns
    /// the id the stream task must tag its events with, plus its token.
    pub fn begin_stream(&mut self) -> (u64, CancellationToken) {
        self.cancel_current_stream();
        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        self.is_streaming = true;
        self.stream_started = Some(Instant::now());
        self.last_elapsed = None;
        (self.current_stream_id, token)
    }

    /// Freeze the response timer, keeping the final reading.
    pub fn stop_timer(&mut self) {
        if let Some(started) = self.stream_started.take() {
            self.last_elapsed = Some(started.elapsed());
        }
    }

    /// Live elapsed time while streaming, else the last finished reading.
    pub fn response_elapsed(&self) -> Option<Duration> {
        match self.stream_started {
            Some(started) => Some(started.elapsed()),
            None => self.last_elapsed,
        }
    }

    pub fn draft_content(&self) -> Option<&str> {
        match &self.draft {
            DraftState::Drafting(draft) => Some(draft.content.as_str()),
            DraftState::NoDraft => None,
        }
    }

    /// History to serialize into an outbound request.
    pub fn api_history(&self) -> Vec<Message> {
        self.chat
            .history
            .iter()
            .filter(|m| m.is_api_visible())
            .cloned()
            .collect()
    }

    /// Swap in a different conversation, dropping stream state.
    pub fn load_chat(&mut self, chat: Chat) {
        self.cancel_current_stream();
        self.chat = chat;
        self.draft = DraftState::NoDraft;
        self.mode = StreamMode::Normal;
        self.is_streaming = false;
        self.stream_started = None;
        self.last_elapsed = None;
        self.dirty = false;
        self.rebuild_transcript();
    }

    pub fn edit_message(&mut self, index: usize, content: String) -> Result<(), String> {
        match self.chat.history.get_mut(index) {
            Some(message) => {
                message.content = content;
                self.dirty = true;
                self.rebuild_transcript();
                Ok(())
            }
            None => Err(format!("no message at index {index}")),
        }
    }

    pub fn delete_message(&mut self, index: usize) -> Result<Message, String> {
        if index >= self.chat.history.len() {
            return Err(format!("no message at index {index}"));
        }
        let removed = self.chat.history.remove(index);
        self.dirty = true;
        self.rebuild_transcript();
        Ok(removed)
    }

    pub fn clear_history(&mut self) {
        self.chat.history.clear();
        self.transcript.clear();
        self.draft = DraftState::NoDraft;
        self.mode = StreamMode::Normal;
        self.dirty = true;
    }

    /// Index of the most recent assistant entry, if any.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.chat
            .history
            .iter()
            .rposition(|m| m.is_assistant())
    }

    /// Resolve an optional user-supplied index against the last assistant
    /// entry, the common default for copy / speak / bookmark / regenerate.
    pub fn resolve_message_index(&self, index: Option<usize>) -> Result<usize, String> {
        match index {
            Some(i) if i < self.chat.history.len() => Ok(i),
            Some(i) => Err(format!("no message at index {i}")),
            None => self
                .last_assistant_index()
                .ok_or_else(|| "no assistant reply yet".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_history(entries: &[Message]) -> SessionContext {
        let mut chat = Chat::new("llama3");
        chat.history = entries.to_vec();
        SessionContext::new(chat)
    }

    #[test]
    fn transcript_mirrors_history_on_build() {
        let session = session_with_history(&[
            Message::user("q"),
            Message::assistant("a"),
        ]);
        assert_eq!(session.transcript.len(), 2);
        match &session.transcript[1] {
            TranscriptCell::Committed {
                message,
                history_index,
            } => {
                assert_eq!(*history_index, 1);
                assert!(message.is_assistant());
            }
            other => panic!("expected committed cell, got {:?}", other),
        }
    }

    #[test]
    fn begin_stream_bumps_id_and_replaces_token() {
        let mut session = session_with_history(&[]);
        let (first_id, first_token) = session.begin_stream();
        let (second_id, _) = session.begin_stream();
        assert_eq!(second_id, first_id + 1);
        assert!(first_token.is_cancelled());
        assert!(session.is_current_stream(second_id));
        assert!(!session.is_current_stream(first_id));
    }

    #[test]
    fn edit_and_delete_respect_bounds() {
        let mut session = session_with_history(&[Message::user("q")]);
        assert!(session.edit_message(0, "q2".into()).is_ok());
        assert_eq!(session.chat.history[0].content, "q2");
        assert!(session.edit_message(5, "x".into()).is_err());
        assert!(session.delete_message(5).is_err());
        assert!(session.delete_message(0).is_ok());
        assert!(session.chat.history.is_empty());
        assert!(session.transcript.is_empty());
    }

    #[test]
    fn notices_stay_out_of_history() {
        let mut session = session_with_history(&[Message::user("q")]);
        session.push_notice(Message::info("saved"));
        assert_eq!(session.chat.history.len(), 1);
        assert_eq!(session.transcript.len(), 2);
        assert!(session.api_history().iter().all(|m| m.is_api_visible()));
    }

    #[test]
    fn resolve_index_defaults_to_last_assistant() {
        let session = session_with_history(&[
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
        ]);
        assert_eq!(session.resolve_message_index(None).unwrap(), 1);
        assert_eq!(session.resolve_message_index(Some(2)).unwrap(), 2);
        assert!(session.resolve_message_index(Some(9)).is_err());
    }

    #[test]
    fn timer_freezes_on_stop() {
        let mut session = session_with_history(&[]);
        session.begin_stream();
        assert!(session.response_elapsed().is_some());
        session.stop_timer();
        let frozen = session.response_elapsed().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(session.response_elapsed().unwrap(), frozen);
    }
}
