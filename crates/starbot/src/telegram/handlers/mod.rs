//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.

mod commands;
mod purchase;
mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError, UserInfo};
