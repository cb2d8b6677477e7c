use tokio::sync::mpsc;
use tui_textarea::{CursorMove, TextArea};

use crate::api::{ApiClient, SendMessageRequest, DEFAULT_BASE_URL};
use crate::core::bookmarks::BookmarkStore;
use crate::core::chat::Chat;
use crate::core::chat_store::ChatStore;
use crate::core::chat_stream::{ChatStreamService, StreamEvent, StreamParams};
use crate::core::config::Config;
use crate::core::image_history::ImageHistory;
use crate::core::message::Message;
use crate::core::persona::PersonaManager;
use crate::core::preset::PresetManager;
use crate::core::providers::ProviderManager;
use crate::core::reactions::ReactionStore;
use crate::core::reconcile::StreamOutcome;
use crate::core::session::SessionContext;
use crate::ui::theme::Theme;
use crate::utils::logging::TranscriptLog;
use crate::utils::scroll::ScrollState;

/// Session-level choices resolved by the CLI before launch. Flags win over
/// config values; absent both, the backend defaults apply.
#[derive(Default)]
pub struct LaunchOptions {
    pub model: Option<String>,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub log_file: Option<String>,
}

/// Everything the event loop, the renderer, and the command handlers share.
pub struct App {
    pub config: Config,
    pub client: ApiClient,
    pub session: SessionContext,
    pub stream: ChatStreamService,
    pub chat_store: ChatStore,
    pub bookmarks: BookmarkStore,
    pub images: ImageHistory,
    pub reactions: ReactionStore,
    pub personas: PersonaManager,
    pub providers: ProviderManager,
    pub presets: PresetManager,
    pub log: TranscriptLog,
    pub theme: Theme,
    pub markdown_enabled: bool,
    pub syntax_enabled: bool,
    pub textarea: TextArea<'static>,
    pub scroll: ScrollState,
    /// Base64 images staged by `/attach`, consumed by the next sent message.
    pub pending_images: Vec<String>,
    pub exit_requested: bool,
}

impl App {
    pub fn new(
        config: Config,
        options: LaunchOptions,
    ) -> (Self, mpsc::UnboundedReceiver<(StreamEvent, u64)>) {
        let base_url = options
            .base_url
            .or_else(|| config.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = options
            .model
            .or_else(|| config.default_model.clone())
            .unwrap_or_default();
        let remembered_provider = options.provider.or_else(|| config.default_provider.clone());

        let theme = Theme::resolve(config.theme.as_deref().unwrap_or("dark"), &config);
        let personas = PersonaManager::new(config.persona.clone());
        let providers = ProviderManager::new(remembered_provider);
        let presets = PresetManager::load(&config);
        let (stream, rx) = ChatStreamService::new();

        let mut app = Self {
            client: ApiClient::new(base_url),
            session: SessionContext::new(Chat::new(model)),
            stream,
            chat_store: ChatStore::new(),
            bookmarks: BookmarkStore::new(),
            images: ImageHistory::new(),
            reactions: ReactionStore::new(),
            personas,
            providers,
            presets,
            log: TranscriptLog::new(options.log_file),
            markdown_enabled: config.markdown.unwrap_or(true),
            syntax_enabled: config.syntax.unwrap_or(true),
            textarea: TextArea::default(),
            scroll: ScrollState::default(),
            pending_images: Vec::new(),
            exit_requested: false,
            theme,
            config,
        };
        app.configure_textarea();
        (app, rx)
    }

    /// One-time backend discovery after launch. Failures surface as notices
    /// and leave the session usable; the list commands can retry later.
    pub async fn bootstrap(&mut self) {
        match self.client.health().await {
            Ok(health) => {
                if !health.ollama {
                    self.notify("Backend reachable, but Ollama is not running.");
                }
            }
            Err(e) => {
                self.notify_error(format!(
                    "backend not reachable at {}: {e}",
                    self.client.base_url()
                ));
                return;
            }
        }

        match self.client.providers().await {
            Ok(response) => self
                .providers
                .set_providers(response.providers, response.current),
            Err(e) => self.notify_error(format!("provider list failed: {e}")),
        }
        match self.client.personas().await {
            Ok(response) => self.personas.set_personas(response.personas),
            Err(e) => self.notify_error(format!("persona list failed: {e}")),
        }

        if self.session.chat.model.is_empty() {
            match self.client.models().await {
                Ok(models) => match models.into_iter().next() {
                    Some(first) => {
                        self.notify(format!("Model: {first}"));
                        self.session.chat.model = first;
                    }
                    None => self.notify("No models installed. Pull one with `ollama pull`."),
                },
                Err(e) => self.notify_error(format!("model list failed: {e}")),
            }
        }
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.session.push_notice(Message::info(text));
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.session.push_notice(Message::error(text));
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn set_input_text(&mut self, text: &str) {
        let lines: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        self.textarea = TextArea::from(lines);
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
        self.configure_textarea();
    }

    pub fn set_theme(&mut self, name: &str) {
        self.theme = Theme::resolve(name, &self.config);
        self.configure_textarea();
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_style(self.theme.input_text);
        // Without this the active line gets tui-textarea's underline default.
        self.textarea.set_cursor_line_style(self.theme.input_text);
    }

    /// Stage the user turn and open a stream for the reply.
    pub fn submit_prompt(&mut self, text: String) {
        if self.session.chat.model.is_empty() {
            self.notify_error("No model selected. Use /model <name> or /models.");
            return;
        }
        if let Some(provider) = self.providers.missing_key(&self.config) {
            self.notify_error(format!(
                "Provider '{}' needs an API key. Use /apikey {} <key>.",
                provider.name, provider.id
            ));
            return;
        }

        let message = if self.pending_images.is_empty() {
            Message::user(text)
        } else {
            Message::user_with_images(text, std::mem::take(&mut self.pending_images))
        };
        let _ = self.log.log_message(&message);
        self.session.push_history(message);
        self.scroll.follow = true;
        self.start_stream(self.session.api_history());
    }

    /// `/continue`: ask the model to keep going. The nudge turn exists only in
    /// the request body, never in history or on screen.
    pub fn continue_response(&mut self) {
        let mut history = self.session.api_history();
        history.push(Message::user("\n"));
        self.start_stream(history);
    }

    pub fn regenerate(&mut self, index: Option<usize>) -> Result<(), String> {
        let index = match index {
            Some(i) => i,
            None => self
                .session
                .last_assistant_index()
                .ok_or_else(|| "no assistant reply to regenerate".to_string())?,
        };
        let prefix = self.session.prepare_regeneration(index)?;
        let api: Vec<Message> = prefix.into_iter().filter(|m| m.is_api_visible()).collect();
        self.start_stream(api);
        Ok(())
    }

    fn start_stream(&mut self, history: Vec<Message>) {
        let (provider, api_key) = self.providers.request_fields(&self.config);
        let request = SendMessageRequest {
            model_name: self.session.chat.model.clone(),
            history,
            provider,
            api_key,
            persona: self.personas.active_id().map(str::to_string),
        };
        let (stream_id, cancel_token) = self.session.begin_stream();
        self.stream.spawn_stream(StreamParams {
            client: self.client.http().clone(),
            base_url: self.client.base_url().to_string(),
            request,
            cancel_token,
            stream_id,
        });
    }

    /// Apply one tagged stream event. Events from superseded streams are
    /// dropped here, which is what makes rapid re-sends safe.
    pub fn on_stream_event(&mut self, event: StreamEvent, stream_id: u64) -> StreamOutcome {
        if !self.session.is_current_stream(stream_id) {
            return StreamOutcome::default();
        }
        let outcome = self.session.apply_stream_event(event);
        if let Some(index) = outcome.committed_index {
            if let Some(message) = self.session.chat.history.get(index) {
                let _ = self.log.log_message(message);
            }
        }
        if outcome.save_chat {
            self.save_current_chat(false);
        }
        outcome
    }

    pub fn save_current_chat(&mut self, announce: bool) {
        if self.session.chat.temporary {
            if announce {
                self.notify("Temporary chat: not saved.");
            }
            return;
        }
        self.session.chat.ensure_title();
        match self.chat_store.save_chat(&self.session.chat) {
            Ok(()) => {
                self.session.dirty = false;
                if announce {
                    self.notify(format!("Chat saved: {}", self.session.chat.display_title()));
                }
            }
            Err(e) => self.notify_error(format!("save failed: {e}")),
        }
    }

    /// `/edit`: pull a user turn back into the input box and drop it plus
    /// everything after it, ready to be resent.
    pub fn edit_into_input(&mut self, index: usize) -> Result<(), String> {
        match self.session.chat.history.get(index) {
            Some(m) if m.is_user() => {}
            Some(_) => return Err(format!("message {index} is not a user message")),
            None => return Err(format!("no message at index {index}")),
        }
        self.session.cancel_current_stream();
        let content = self.session.chat.history[index].content.clone();
        self.session.chat.history.truncate(index);
        self.session.dirty = true;
        self.session.rebuild_transcript();
        let _ = self.log.rewrite_without(&self.session.chat.history, None);
        self.set_input_text(&content);
        Ok(())
    }

    pub fn delete_message(&mut self, index: usize) -> Result<(), String> {
        self.session.delete_message(index)?;
        let _ = self.log.rewrite_without(&self.session.chat.history, None);
        Ok(())
    }

    /// Set or replace the leading system prompt.
    pub fn set_system_prompt(&mut self, prompt: String) {
        match self.session.chat.history.first() {
            Some(m) if m.role == crate::core::message::Role::System => {
                // edit_message rebuilds the transcript for us
                let _ = self.session.edit_message(0, prompt);
            }
            _ => {
                self.session.chat.history.insert(0, Message::system(prompt));
                self.session.dirty = true;
                self.session.rebuild_transcript();
            }
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        match self.session.chat.history.first() {
            Some(m) if m.role == crate::core::message::Role::System => Some(&m.content),
            _ => None,
        }
    }

    /// Swap in a chat, keeping the current one's model if the loaded chat
    /// predates model tracking.
    pub fn open_chat(&mut self, mut chat: Chat) {
        if chat.model.is_empty() {
            chat.model = self.session.chat.model.clone();
        }
        self.session.load_chat(chat);
        self.scroll = ScrollState::default();
    }

    pub fn new_chat(&mut self, temporary: bool) {
        let model = self.session.chat.model.clone();
        let chat = if temporary {
            Chat::temporary(model)
        } else {
            Chat::new(model)
        };
        self.open_chat(chat);
    }
}
