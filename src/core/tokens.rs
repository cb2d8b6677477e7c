use crate::core::chat::Chat;
use crate::core::message::Role;

/// Rough token estimate used for the stats display. Four characters per token
/// is the usual back-of-envelope figure for English prose.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[derive(Debug, Default, PartialEq)]
pub struct ChatStats {
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub system_messages: usize,
    pub total_chars: usize,
    pub estimated_tokens: usize,
}

pub fn chat_stats(chat: &Chat) -> ChatStats {
    let mut stats = ChatStats::default();
    for message in &chat.history {
        match message.role {
            Role::User => stats.user_messages += 1,
            Role::Assistant => stats.assistant_messages += 1,
            Role::System => stats.system_messages += 1,
            Role::AppInfo | Role::AppError => continue,
        }
        stats.message_count += 1;
        stats.total_chars += message.content.chars().count();
        stats.estimated_tokens += estimate_tokens(&message.content);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn estimate_counts_chars_not_bytes() {
        // Four multibyte chars still make one token.
        assert_eq!(estimate_tokens("日本語だ"), 1);
    }

    #[test]
    fn stats_skip_app_notices() {
        let mut chat = Chat::new("test-model");
        chat.history.push(Message::user("hello there"));
        chat.history.push(Message::assistant("hi"));
        chat.history.push(Message::info("saved"));
        chat.history.push(Message::system("be brief"));

        let stats = chat_stats(&chat);
        assert_eq!(stats.message_count, 3);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.assistant_messages, 1);
        assert_eq!(stats.system_messages, 1);
        assert_eq!(stats.total_chars, 11 + 2 + 8);
        assert_eq!(
            stats.estimated_tokens,
            estimate_tokens("hello there") + estimate_tokens("hi") + estimate_tokens("be brief")
        );
    }
}
