//! Chatbowl is a terminal chat client for a Chat Bowl inference backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state: the session context, the stream
//!   reconciler that folds server-sent records into history, saved-chat and
//!   bookmark stores, and configuration.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives input, drawing, and stream-event draining.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   chat loop.
//! - [`api`] defines the backend wire types and the typed HTTP client.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
