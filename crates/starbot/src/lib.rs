//! starbot - Telegram bot selling Stars for TON
//!
//! Quantities typed in chat are priced with a fee markup, and the user gets a
//! message with the TON amount and wallet deep links that pre-fill the transfer.
//! Pricing, links and storage live in `starcore`; this crate holds the
//! Telegram side.
//!
//! # Module Structure
//!
//! - `cli`: Command-line interface
//! - `i18n`: Fluent translations (ru, en)
//! - `telegram`: Bot setup, dispatcher schema, handlers and keyboards

pub mod cli;
pub mod i18n;
pub mod telegram;
