pub mod app;
pub mod bookmarks;
pub mod chat;
pub mod chat_store;
pub mod chat_stream;
pub mod config;
pub mod image_history;
pub mod message;
pub mod persona;
pub mod preset;
pub mod providers;
pub mod reactions;
pub mod reconcile;
pub mod search;
pub mod session;
pub mod store;
pub mod tokens;
