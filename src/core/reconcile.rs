//! Applies stream events to the session: draft accumulation, commit into
//! authoritative history, regeneration tail splicing, and the two error
//! surfaces. All branches of one record run in one pass; the fields are not
//! exclusive.

use crate::core::chat_stream::StreamEvent;
use crate::core::message::Message;
use crate::core::session::{
    DraftResponse, DraftState, SessionContext, StreamMode, TranscriptCell,
};

/// What the event loop must do after one event was applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamOutcome {
    /// History index of a freshly committed assistant entry.
    pub committed_index: Option<usize>,
    /// The chat should be written to the store now.
    pub save_chat: bool,
    /// Follow the newest content (never set during regenerations).
    pub scroll_to_latest: bool,
    /// The in-flight state was cleared by this event.
    pub stream_ended: bool,
}

impl SessionContext {
    /// Enter `Drafting` if this is the first record of the session. For
    /// regenerations the captured tail is pre-rendered below the draft so the
    /// displayed order already matches the post-commit order.
    fn ensure_draft(&mut self) {
        if matches!(self.draft, DraftState::Drafting(_)) {
            return;
        }
        let cell = self.transcript.len();
        self.transcript.push(TranscriptCell::Draft);
        if let StreamMode::Regeneration { tail } = &self.mode {
            for entry in tail.clone() {
                self.transcript.push(TranscriptCell::Preview(entry));
            }
        }
        self.draft = DraftState::Drafting(DraftResponse {
            content: String::new(),
            cell,
        });
    }

    /// Convert the draft into a committed history entry. Regeneration tails
    /// are spliced onto whatever the history is *now*; edits made while the
    /// stream was in flight stay, and the tail wins the end slots.
    fn commit_draft(&mut self) -> usize {
        self.stop_timer();
        let DraftResponse { content, cell } =
            match std::mem::take(&mut self.draft) {
                DraftState::Drafting(draft) => draft,
                DraftState::NoDraft => DraftResponse {
                    content: String::new(),
                    cell: self.transcript.len(),
                },
            };

        let message = Message::assistant(content);
        self.chat.history.push(message.clone());
        let history_index = self.chat.history.len() - 1;

        match std::mem::take(&mut self.mode) {
            StreamMode::Normal => {
                let committed = TranscriptCell::Committed {
                    message,
                    history_index,
                };
                if cell < self.transcript.len() {
                    self.transcript[cell] = committed;
                } else {
                    self.transcript.push(committed);
                }
            }
            StreamMode::Regeneration { tail } => {
                self.chat.history.extend(tail);
                self.rebuild_transcript();
            }
        }

        self.is_streaming = false;
        self.dirty = true;
        history_index
    }

    /// Leave the draft visible on the display surface without committing it.
    /// Used by transport failures and interrupts; the in-stream `error`
    /// record path deliberately does not come through here.
    fn abandon_draft(&mut self) {
        if let DraftState::Drafting(DraftResponse { content, cell }) =
            std::mem::take(&mut self.draft)
        {
            if content.is_empty() {
                if cell < self.transcript.len() {
                    self.transcript.remove(cell);
                }
            } else if cell < self.transcript.len() {
                self.transcript[cell] = TranscriptCell::Preview(Message::assistant(content));
            }
        }
        self.mode = StreamMode::Normal;
    }

    /// Apply one stream event. Caller has already checked the stream id.
    pub fn apply_stream_event(&mut self, event: StreamEvent) -> StreamOutcome {
        let mut outcome = StreamOutcome::default();
        match event {
            StreamEvent::Record(record) => {
                self.ensure_draft();

                if let Some(content) = record.content {
                    if let DraftState::Drafting(draft) = &mut self.draft {
                        draft.content.push_str(&content);
                    }
                    outcome.scroll_to_latest = matches!(self.mode, StreamMode::Normal);
                }

                if record.done {
                    let index = self.commit_draft();
                    outcome.committed_index = Some(index);
                    outcome.save_chat = !self.chat.temporary;
                    outcome.stream_ended = true;
                }

                if let Some(error) = record.error {
                    self.push_notice(Message::error(error));
                    self.stop_timer();
                }
            }
            StreamEvent::TransportFailed(text) => {
                self.push_notice(Message::error(text));
                self.stop_timer();
                self.abandon_draft();
                self.is_streaming = false;
                outcome.stream_ended = true;
            }
            StreamEvent::Closed => {
                self.stop_timer();
                self.abandon_draft();
                self.is_streaming = false;
                outcome.stream_ended = true;
            }
        }
        outcome
    }

    /// User-initiated stop. Cancels the task; the draft stays visible but
    /// uncommitted, like a transport failure without the error notice.
    pub fn interrupt_stream(&mut self) {
        if !self.is_streaming {
            return;
        }
        self.cancel_current_stream();
        self.stop_timer();
        self.abandon_draft();
        self.is_streaming = false;
        self.push_notice(Message::info("Generation stopped."));
    }

    /// Capture the regeneration context for the assistant entry at `index`:
    /// history is truncated to the prefix, the old reply is dropped, and the
    /// following entries ride along as the tail until commit. Returns the
    /// prefix to send.
    pub fn prepare_regeneration(&mut self, index: usize) -> Result<Vec<Message>, String> {
        match self.chat.history.get(index) {
            Some(m) if m.is_assistant() => {}
            Some(_) => return Err(format!("message {index} is not an assistant reply")),
            None => return Err(format!("no message at index {index}")),
        }

        let tail = self.chat.history.split_off(index + 1);
        self.chat.history.truncate(index);
        self.mode = StreamMode::Regeneration { tail };
        self.draft = DraftState::NoDraft;
        self.rebuild_transcript();
        self.dirty = true;
        Ok(self.chat.history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StreamRecord;
    use crate::core::chat::Chat;

    fn record(content: Option<&str>, done: bool, error: Option<&str>) -> StreamEvent {
        StreamEvent::Record(StreamRecord {
            content: content.map(str::to_string),
            done,
            error: error.map(str::to_string),
        })
    }

    fn session_with_history(entries: Vec<Message>) -> SessionContext {
        let mut chat = Chat::new("llama3");
        chat.history = entries;
        SessionContext::new(chat)
    }

    fn streaming_session(entries: Vec<Message>) -> SessionContext {
        let mut session = session_with_history(entries);
        session.begin_stream();
        session
    }

    #[test]
    fn fragments_accumulate_and_commit_as_one_entry() {
        let mut session = streaming_session(vec![Message::user("hello")]);

        session.apply_stream_event(record(Some("Hi"), false, None));
        session.apply_stream_event(record(Some(" there"), false, None));
        let outcome = session.apply_stream_event(record(None, true, None));

        assert_eq!(session.chat.history.len(), 2);
        let reply = &session.chat.history[1];
        assert!(reply.is_assistant());
        assert_eq!(reply.content, "Hi there");
        assert_eq!(outcome.committed_index, Some(1));
        assert!(outcome.save_chat);
        assert!(outcome.stream_ended);
        assert_eq!(session.draft, DraftState::NoDraft);
        assert!(!session.is_streaming);
    }

    #[test]
    fn draft_surface_binds_the_final_index() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(record(Some("answer"), false, None));
        assert_eq!(session.transcript[1], TranscriptCell::Draft);

        session.apply_stream_event(record(None, true, None));
        match &session.transcript[1] {
            TranscriptCell::Committed {
                message,
                history_index,
            } => {
                assert_eq!(message.content, "answer");
                assert_eq!(*history_index, 1);
            }
            other => panic!("expected committed cell, got {:?}", other),
        }
    }

    #[test]
    fn history_edits_mid_stream_keep_the_draft_surface() {
        let mut session = streaming_session(vec![Message::user("hi")]);
        session.apply_stream_event(record(Some("partial"), false, None));

        // A prompt change while streaming rebuilds the display surface.
        session.chat.history.insert(0, Message::system("be brief"));
        session.rebuild_transcript();

        let drafts = session
            .transcript
            .iter()
            .filter(|c| matches!(c, TranscriptCell::Draft))
            .count();
        assert_eq!(drafts, 1);
        assert_eq!(session.draft_content(), Some("partial"));

        session.apply_stream_event(record(None, true, None));
        assert_eq!(session.chat.history.len(), 3);
        assert_eq!(session.transcript.len(), 3);
        for (i, cell) in session.transcript.iter().enumerate() {
            match cell {
                TranscriptCell::Committed {
                    message,
                    history_index,
                } => {
                    assert_eq!(*history_index, i);
                    assert_eq!(message.content, session.chat.history[i].content);
                }
                other => panic!("expected committed cell at {i}, got {:?}", other),
            }
        }
        assert_eq!(session.chat.history[2].content, "partial");
    }

    #[test]
    fn content_and_done_in_one_record_commit_in_one_step() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(record(Some("Hi"), false, None));
        let outcome = session.apply_stream_event(record(Some(" and bye"), true, None));

        assert_eq!(session.chat.history[1].content, "Hi and bye");
        assert_eq!(outcome.committed_index, Some(1));
    }

    #[test]
    fn done_only_stream_commits_an_empty_entry() {
        let mut session = streaming_session(vec![Message::user("q")]);

        let outcome = session.apply_stream_event(record(None, true, None));

        assert_eq!(session.chat.history.len(), 2);
        assert_eq!(session.chat.history[1].content, "");
        assert!(session.chat.history[1].is_assistant());
        assert_eq!(outcome.committed_index, Some(1));
    }

    #[test]
    fn error_only_record_commits_nothing_and_keeps_the_draft() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(record(Some("partial"), false, None));
        let outcome = session.apply_stream_event(record(None, false, Some("rate limited")));

        assert_eq!(session.chat.history.len(), 1);
        assert_eq!(session.draft_content(), Some("partial"));
        assert!(outcome.committed_index.is_none());
        assert!(!outcome.stream_ended);
        assert!(session.is_streaming);
        assert!(session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Notice(m) if m.content == "Error: rate limited")));
    }

    #[test]
    fn error_alongside_content_is_additive() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(record(Some("before "), false, None));
        session.apply_stream_event(record(Some("after"), false, Some("hiccup")));

        assert_eq!(session.draft_content(), Some("before after"));
        assert_eq!(session.chat.history.len(), 1);
    }

    #[test]
    fn error_then_done_still_commits_the_draft() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(record(Some("kept"), false, Some("blip")));
        session.apply_stream_event(record(None, true, None));

        assert_eq!(session.chat.history.len(), 2);
        assert_eq!(session.chat.history[1].content, "kept");
    }

    #[test]
    fn regeneration_preserves_history_length_and_tail() {
        let mut session = session_with_history(vec![
            Message::user("q1"),
            Message::assistant("old answer"),
            Message::user("q2"),
            Message::assistant("a2"),
        ]);

        let prefix = session.prepare_regeneration(1).unwrap();
        assert_eq!(prefix.len(), 1);
        assert_eq!(session.chat.history.len(), 1);
        session.begin_stream();

        session.apply_stream_event(record(Some("new answer"), false, None));
        session.apply_stream_event(record(None, true, None));

        let history = &session.chat.history;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q1");
        assert_eq!(history[1].content, "new answer");
        assert_eq!(history[2].content, "q2");
        assert_eq!(history[3].content, "a2");
        assert!(matches!(session.mode, StreamMode::Normal));
    }

    #[test]
    fn regeneration_pre_renders_the_tail_below_the_draft() {
        let mut session = session_with_history(vec![
            Message::user("q1"),
            Message::assistant("old"),
            Message::user("q2"),
        ]);
        session.prepare_regeneration(1).unwrap();
        session.begin_stream();

        session.apply_stream_event(record(Some("new"), false, None));

        // prefix cell, draft cell, then the tail preview
        assert_eq!(session.transcript.len(), 3);
        assert_eq!(session.transcript[1], TranscriptCell::Draft);
        assert!(matches!(
            &session.transcript[2],
            TranscriptCell::Preview(m) if m.content == "q2"
        ));
        // display only: authoritative history is still just the prefix
        assert_eq!(session.chat.history.len(), 1);
    }

    #[test]
    fn regeneration_does_not_force_scroll() {
        let mut session = session_with_history(vec![
            Message::user("q"),
            Message::assistant("old"),
        ]);
        session.prepare_regeneration(1).unwrap();
        session.begin_stream();

        let outcome = session.apply_stream_event(record(Some("new"), false, None));
        assert!(!outcome.scroll_to_latest);

        let mut normal = streaming_session(vec![Message::user("q")]);
        let outcome = normal.apply_stream_event(record(Some("x"), false, None));
        assert!(outcome.scroll_to_latest);
    }

    #[test]
    fn tail_splice_uses_the_current_history() {
        let mut session = session_with_history(vec![
            Message::user("q1"),
            Message::assistant("old"),
            Message::user("tail question"),
        ]);
        session.prepare_regeneration(1).unwrap();
        session.begin_stream();
        session.apply_stream_event(record(Some("new"), false, None));

        // user edits the prefix while the stream is in flight
        session.edit_message(0, "q1 (edited)".to_string()).unwrap();

        session.apply_stream_event(record(None, true, None));

        let history = &session.chat.history;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "q1 (edited)");
        assert_eq!(history[1].content, "new");
        assert_eq!(history[2].content, "tail question");
    }

    #[test]
    fn regeneration_rejects_non_assistant_targets() {
        let mut session = session_with_history(vec![
            Message::user("q"),
            Message::assistant("a"),
        ]);
        assert!(session.prepare_regeneration(0).is_err());
        assert!(session.prepare_regeneration(7).is_err());
    }

    #[test]
    fn transport_failure_abandons_the_draft_without_commit() {
        let mut session = streaming_session(vec![Message::user("q")]);
        session.apply_stream_event(record(Some("orphan"), false, None));

        let outcome =
            session.apply_stream_event(StreamEvent::TransportFailed("request failed".into()));

        assert_eq!(session.chat.history.len(), 1);
        assert_eq!(session.draft, DraftState::NoDraft);
        assert!(!session.is_streaming);
        assert!(outcome.stream_ended);
        assert!(outcome.committed_index.is_none());
        // still visible on the display surface, just never committed
        assert!(session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Preview(m) if m.content == "orphan")));
        assert!(session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Notice(m) if m.content.starts_with("Error: "))));
    }

    #[test]
    fn transport_failure_with_empty_draft_leaves_no_empty_bubble() {
        let mut session = streaming_session(vec![Message::user("q")]);

        session.apply_stream_event(StreamEvent::TransportFailed("request failed".into()));

        assert!(!session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Draft | TranscriptCell::Preview(_))));
    }

    #[test]
    fn closed_stream_without_done_cleans_up_silently() {
        let mut session = streaming_session(vec![Message::user("q")]);
        session.apply_stream_event(record(Some("half"), false, None));

        let outcome = session.apply_stream_event(StreamEvent::Closed);

        assert!(outcome.stream_ended);
        assert_eq!(session.chat.history.len(), 1);
        assert!(!session.is_streaming);
        assert!(!session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Notice(_))));
    }

    #[test]
    fn temporary_chats_commit_without_requesting_a_save() {
        let mut chat = Chat::temporary("llama3");
        chat.history.push(Message::user("q"));
        let mut session = SessionContext::new(chat);
        session.begin_stream();

        session.apply_stream_event(record(Some("a"), false, None));
        let outcome = session.apply_stream_event(record(None, true, None));

        assert_eq!(outcome.committed_index, Some(1));
        assert!(!outcome.save_chat);
    }

    #[test]
    fn notices_during_drafting_do_not_disturb_the_draft_cell() {
        let mut session = streaming_session(vec![Message::user("q")]);
        session.apply_stream_event(record(Some("body"), false, None));
        session.apply_stream_event(record(None, false, Some("warning")));
        session.apply_stream_event(record(Some(" more"), false, None));
        session.apply_stream_event(record(None, true, None));

        assert_eq!(session.chat.history[1].content, "body more");
        match &session.transcript[1] {
            TranscriptCell::Committed { history_index, .. } => assert_eq!(*history_index, 1),
            other => panic!("expected committed cell, got {:?}", other),
        }
    }

    #[test]
    fn interrupt_keeps_partial_content_visible() {
        let mut session = streaming_session(vec![Message::user("q")]);
        session.apply_stream_event(record(Some("partial"), false, None));

        session.interrupt_stream();

        assert!(!session.is_streaming);
        assert_eq!(session.chat.history.len(), 1);
        assert!(session
            .transcript
            .iter()
            .any(|c| matches!(c, TranscriptCell::Preview(m) if m.content == "partial")));
    }
}
