//! Telegram integration: bot setup, dispatcher schema, keyboards and texts

pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod messages;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
