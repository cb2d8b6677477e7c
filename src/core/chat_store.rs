use std::path::PathBuf;

use crate::core::chat::Chat;
use crate::core::store::{data_dir, read_json_file, write_json_file, StoreError};

/// Repository for saved chats, a single JSON file holding every saved
/// conversation. Replaces what the browser build kept in local storage.
pub struct ChatStore {
    path: PathBuf,
}

impl ChatStore {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("chats.json"),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load_all(&self) -> Result<Vec<Chat>, StoreError> {
        read_json_file(&self.path)
    }

    pub fn find(&self, id: &str) -> Result<Option<Chat>, StoreError> {
        Ok(self.load_all()?.into_iter().find(|c| c.id == id))
    }

    /// Insert or update by id. Temporary chats are refused at the call sites;
    /// this method persists whatever it is given.
    pub fn save_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        let mut chats = self.load_all()?;
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat.clone(),
            None => chats.push(chat.clone()),
        }
        write_json_file(&self.path, &chats)
    }

    /// Returns false when no chat had the id.
    pub fn delete_chat(&self, id: &str) -> Result<bool, StoreError> {
        let mut chats = self.load_all()?;
        let before = chats.len();
        chats.retain(|c| c.id != id);
        if chats.len() == before {
            return Ok(false);
        }
        write_json_file(&self.path, &chats)?;
        Ok(true)
    }

    pub fn rename_chat(&self, id: &str, title: &str) -> Result<bool, StoreError> {
        let mut chats = self.load_all()?;
        let Some(chat) = chats.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        chat.title = title.to_string();
        write_json_file(&self.path, &chats)?;
        Ok(true)
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}
