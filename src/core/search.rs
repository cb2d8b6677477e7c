use crate::core::chat::Chat;
use crate::core::message::Role;

const SNIPPET_CONTEXT: usize = 30;
const MAX_RESULTS: usize = 20;

#[derive(Debug, PartialEq)]
pub struct SearchHit {
    pub chat_id: String,
    pub chat_title: String,
    pub message_index: usize,
    pub role: Role,
    pub snippet: String,
}

/// Case-insensitive substring search over the current chat and every saved
/// chat. The current chat is scanned first so its hits rank ahead of the
/// archive; results are capped at twenty.
pub fn search_chats<'a>(
    query: &str,
    current: &'a Chat,
    saved: impl IntoIterator<Item = &'a Chat>,
) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    scan_chat(current, &needle, &mut hits);
    for chat in saved {
        if hits.len() >= MAX_RESULTS {
            break;
        }
        // The current chat may itself be saved; skip its duplicate.
        if chat.id == current.id {
            continue;
        }
        scan_chat(chat, &needle, &mut hits);
    }
    hits.truncate(MAX_RESULTS);
    hits
}

fn scan_chat(chat: &Chat, needle: &str, hits: &mut Vec<SearchHit>) {
    for (index, message) in chat.history.iter().enumerate() {
        if hits.len() >= MAX_RESULTS {
            return;
        }
        if !message.is_api_visible() {
            continue;
        }
        let haystack = message.content.to_lowercase();
        if let Some(pos) = haystack.find(needle) {
            hits.push(SearchHit {
                chat_id: chat.id.clone(),
                chat_title: chat.display_title(),
                message_index: index,
                role: message.role,
                snippet: snippet_around(&message.content, pos, needle.len()),
            });
        }
    }
}

/// Slice out the match with up to thirty characters of context either side,
/// snapped to char boundaries, with ellipses marking trimmed edges.
fn snippet_around(content: &str, byte_pos: usize, match_len: usize) -> String {
    let mut start = byte_pos.saturating_sub(SNIPPET_CONTEXT);
    while start > 0 && !content.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (byte_pos + match_len + SNIPPET_CONTEXT).min(content.len());
    while end < content.len() && !content.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push('…');
    }
    snippet.push_str(content[start..end].trim());
    if end < content.len() {
        snippet.push('…');
    }
    snippet
}
