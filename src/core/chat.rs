use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::message::Message;

/// One conversation, saved or live. `history` holds only wire-role entries;
/// local notices never enter it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub model: String,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub temporary: bool,
}

/// Shape written by `/export`.
#[derive(Serialize)]
pub struct ChatExport {
    pub title: String,
    pub model: String,
    pub export_date: String,
    pub messages: Vec<Message>,
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Timestamp-based id with a counter suffix so same-millisecond chats stay
/// distinct.
pub fn generate_chat_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{millis:x}-{seq:x}")
}

impl Chat {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: generate_chat_id(),
            title: String::new(),
            model: model.into(),
            history: Vec::new(),
            temporary: false,
        }
    }

    pub fn temporary(model: impl Into<String>) -> Self {
        let mut chat = Self::new(model);
        chat.temporary = true;
        chat
    }

    /// Title for display: the explicit title, else one derived from the first
    /// user message, else a placeholder.
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        derive_title(&self.history)
    }

    /// Fix the title before saving if the user never set one.
    pub fn ensure_title(&mut self) {
        if self.title.is_empty() {
            self.title = derive_title(&self.history);
        }
    }

    pub fn to_export(&self) -> ChatExport {
        ChatExport {
            title: self.display_title(),
            model: self.model.clone(),
            export_date: Utc::now().to_rfc3339(),
            messages: self.history.clone(),
        }
    }
}

fn derive_title(history: &[Message]) -> String {
    let Some(first_user) = history.iter().find(|m| m.is_user()) else {
        return "New chat".to_string();
    };
    let text = first_user.content.trim();
    if text.is_empty() {
        return "New chat".to_string();
    }
    let mut title: String = text.chars().take(40).collect();
    if text.chars().count() > 40 {
        title.push('…');
    }
    title
}
