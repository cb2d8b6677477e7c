pub mod chat_loop;
pub mod header;
pub mod markdown;
pub mod theme;
pub mod transcript;
