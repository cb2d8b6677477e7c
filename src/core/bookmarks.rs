use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::chat::generate_chat_id;
use crate::core::message::Role;
use crate::core::store::{data_dir, read_json_file, write_json_file, StoreError};

const PREVIEW_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub chat_id: String,
    pub message_index: usize,
    pub content: String,
    pub role: Role,
    pub timestamp: String,
}

/// Bookmarked messages, newest first, in a single JSON file beside the saved
/// chats. Only a preview of the content is stored.
pub struct BookmarkStore {
    path: PathBuf,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("bookmarks.json"),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        read_json_file(&self.path)
    }

    pub fn add(
        &self,
        chat_id: &str,
        message_index: usize,
        role: Role,
        content: &str,
    ) -> Result<Bookmark, StoreError> {
        let bookmark = Bookmark {
            id: generate_chat_id(),
            chat_id: chat_id.to_string(),
            message_index,
            content: preview(content),
            role,
            timestamp: Utc::now().to_rfc3339(),
        };
        let mut bookmarks = self.load_all()?;
        bookmarks.insert(0, bookmark.clone());
        write_json_file(&self.path, &bookmarks)?;
        Ok(bookmark)
    }

    /// Returns false when no bookmark had the id.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut bookmarks = self.load_all()?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        write_json_file(&self.path, &bookmarks)?;
        Ok(true)
    }
}

impl Default for BookmarkStore {
    fn default() -> Self {
        Self::new()
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LIMIT {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(PREVIEW_LIMIT).collect();
    truncated.push('…');
    truncated
}
