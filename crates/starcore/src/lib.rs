//! starcore - pricing, payment links and storage for the Stars-for-TON bot
//!
//! This library has no Telegram dependency (unless the `telegram` feature is
//! enabled for error conversions) and can be used from the bot, the CLI and
//! tests alike.
//!
//! # Module Structure
//!
//! - `core`: Settings, errors, and logging
//! - `pricing`: Quantity bounds, TON amounts, quote computation and price sources
//! - `links`: Wallet deep-link construction
//! - `storage`: SQLite pool, migrations, users/orders/payments

pub mod core;
pub mod links;
pub mod pricing;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::{AppError, AppResult, Settings};
pub use links::PaymentLinks;
pub use pricing::{quote, validate_quantity, Quote, TonAmount};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
