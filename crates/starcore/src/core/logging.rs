//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Secret masking for log output
//! - Startup settings summary

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::Settings;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `level` - Minimum level written to both sinks
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str, level: LevelFilter) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Masks a secret for log output.
///
/// Long values keep their first 6 characters, short ones only report that they
/// are set, missing or blank ones print `(empty)`.
pub fn mask_secret(secret: Option<&str>) -> String {
    const KEEP: usize = 6;

    match secret {
        None => "(empty)".to_string(),
        Some(s) if s.is_empty() => "(empty)".to_string(),
        Some(s) if s.chars().count() > KEEP => format!("{}...", s.chars().take(KEEP).collect::<String>()),
        Some(_) => "(set)".to_string(),
    }
}

/// Logs the effective settings at startup, with secrets masked
pub fn log_startup_diagnostics(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("✅ Settings loaded");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!(" - BOT_TOKEN: {}", mask_secret(Some(settings.bot_token.as_str())));
    log::info!(" - TON_WALLET_ADDRESS: {}", settings.ton_wallet_address);
    log::info!(" - DB: {} ({})", settings.database_url, settings.database_path);
    log::info!(" - FRAGMENT_PRICE_MODE: {}", settings.price_mode);

    if settings.use_price_mock {
        log::info!(" - USE_PRICE_MOCK: true (overrides price mode)");
    }
    match settings.price_http_url {
        Some(ref url) => log::info!(" - FRAGMENT_PRICE_HTTP_URL: {}", url),
        None => log::info!(" - FRAGMENT_PRICE_HTTP_URL: not set"),
    }
    log::info!(" - PRICE_MOCK_TON_PER_STAR: {}", settings.price_mock_ton_per_star);
    log::info!(" - PRICE_FEE_MULTIPLIER: {}", settings.fee_multiplier);
    log::info!(
        " - TON API: {} (key: {})",
        settings.ton_api_provider,
        mask_secret(settings.ton_api_key.as_deref())
    );
    log::info!(
        " - Payment poll/timeout/order TTL: {}s / {}s / {}s",
        settings.payment_poll_interval.as_secs(),
        settings.payment_timeout.as_secs(),
        settings.order_ttl.as_secs()
    );
    log::info!(" - ADMIN_PASSWORD: {}", mask_secret(settings.admin_password.as_deref()));
    log::info!(" - DEFAULT_LANG: {}", settings.default_lang);

    if let Some(ref url) = settings.bot_api_url {
        log::info!(" - BOT_API_URL: {} (local: {})", url, settings.uses_local_bot_api());
    }

    log::debug!(
        "Browser scraping flags (inactive): cookies={:?}, headless={}, slowmo={}ms",
        settings.fragment_auth_cookies_path,
        settings.playwright_headless,
        settings.playwright_slowmo_ms
    );
}
