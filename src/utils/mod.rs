pub mod clipboard;
pub mod logging;
pub mod scroll;
pub mod speech;
pub mod syntax;
pub mod url;
