use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::store::{data_dir, read_json_file, write_json_file, StoreError};

/// One JSON map of per-message emoji reactions, keyed by chat id and message
/// index. Toggling an emoji that is already present removes it.
pub struct ReactionStore {
    path: PathBuf,
}

type ReactionMap = BTreeMap<String, Vec<String>>;

fn key(chat_id: &str, message_index: usize) -> String {
    format!("{chat_id}-{message_index}")
}

impl ReactionStore {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("reactions.json"),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Add the emoji to the message, or remove it if it was already there.
    /// Returns true when the toggle added it.
    pub fn toggle(
        &self,
        chat_id: &str,
        message_index: usize,
        emoji: &str,
    ) -> Result<bool, StoreError> {
        let mut map: ReactionMap = read_json_file(&self.path)?;
        let key = key(chat_id, message_index);
        let entry = map.entry(key.clone()).or_default();
        let added = match entry.iter().position(|e| e == emoji) {
            Some(pos) => {
                entry.remove(pos);
                false
            }
            None => {
                entry.push(emoji.to_string());
                true
            }
        };
        if map.get(&key).is_some_and(Vec::is_empty) {
            map.remove(&key);
        }
        write_json_file(&self.path, &map)?;
        Ok(added)
    }

    pub fn for_message(
        &self,
        chat_id: &str,
        message_index: usize,
    ) -> Result<Vec<String>, StoreError> {
        let map: ReactionMap = read_json_file(&self.path)?;
        Ok(map
            .get(&key(chat_id, message_index))
            .cloned()
            .unwrap_or_default())
    }
}

impl Default for ReactionStore {
    fn default() -> Self {
        Self::new()
    }
}
