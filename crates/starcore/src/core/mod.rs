//! Settings, errors, and logging

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, PriceMode, Settings};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_diagnostics, mask_secret};
