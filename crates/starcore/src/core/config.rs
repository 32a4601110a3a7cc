use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;
use url::Url;

use crate::core::logging::mask_secret;
use crate::pricing::TON_DECIMALS;

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: stars.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "stars.log".to_string()));

/// Log level for both console and file output
/// Read from LOG_LEVEL environment variable (error, warn, info, debug, trace)
/// Default: info
pub static LOG_LEVEL: Lazy<log::LevelFilter> = Lazy::new(|| {
    env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
});

/// Default database location, kept compatible with the async SQLAlchemy-style URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite+aiosqlite:///./stars.db";

/// Default mock price, TON per star
pub const DEFAULT_MOCK_TON_PER_STAR: &str = "0.006451";

/// Default fee markup applied on top of the source price (5%)
pub const DEFAULT_FEE_MULTIPLIER: &str = "1.05";

/// Languages the bot ships translations for
pub const SUPPORTED_LANGS: &[&str] = &["ru", "en"];

/// Where the TON/star rate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PriceMode {
    /// Always the configured mock rate
    Mock,
    /// HTTP when a URL is configured, mock otherwise or on failure
    Auto,
    /// HTTP only; requires FRAGMENT_PRICE_HTTP_URL
    Http,
}

/// TON indexer used for chain lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TonApiProvider {
    Toncenter,
    Tonapi,
}

/// Settings errors, each naming the offending key
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required but not set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("FRAGMENT_PRICE_MODE=http requires FRAGMENT_PRICE_HTTP_URL")]
    MissingPriceUrl,
}

/// Process-wide settings, loaded once at startup and shared read-only.
#[derive(Clone)]
pub struct Settings {
    pub bot_token: String,
    pub ton_wallet_address: String,
    pub ton_api_provider: TonApiProvider,
    pub ton_api_key: Option<String>,
    pub ton_api_base_url: Option<Url>,

    // Declared for the payment watcher; nothing schedules on them yet.
    pub payment_poll_interval: Duration,
    pub payment_timeout: Duration,
    pub order_ttl: Duration,
    pub amount_decimals: u32,

    pub price_mode: PriceMode,
    pub price_http_url: Option<Url>,
    pub price_http_auth_header: Option<String>,
    pub use_price_mock: bool,
    pub price_mock_ton_per_star: Decimal,
    pub fee_multiplier: Decimal,

    // Browser-automation scraping flags. Parsed, never acted upon.
    pub fragment_auth_cookies_path: Option<String>,
    pub playwright_headless: bool,
    pub playwright_slowmo_ms: u64,

    pub database_url: String,
    pub database_path: String,

    pub admin_password: Option<String>,
    pub admin_user_id: Option<i64>,

    pub default_lang: String,
    pub bot_api_url: Option<Url>,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset. Every value is validated here so the
    /// rest of the program can rely on the invariants.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing { key: "BOT_TOKEN" })?;
        let ton_wallet_address = get("TON_WALLET_ADDRESS").ok_or(ConfigError::Missing {
            key: "TON_WALLET_ADDRESS",
        })?;

        let ton_api_provider = parse_or(get("TON_API_PROVIDER"), "TON_API_PROVIDER", TonApiProvider::Toncenter)?;
        let ton_api_base_url = parse_url(get("TON_API_BASE_URL"), "TON_API_BASE_URL")?;

        let payment_poll_interval = parse_secs(get("PAYMENT_POLL_INTERVAL_SEC"), "PAYMENT_POLL_INTERVAL_SEC", 5)?;
        let payment_timeout = parse_secs(get("PAYMENT_TIMEOUT_SEC"), "PAYMENT_TIMEOUT_SEC", 900)?;
        let order_ttl = parse_secs(get("ORDER_TTL_SEC"), "ORDER_TTL_SEC", 600)?;

        let amount_decimals: u32 = parse_or(get("AMOUNT_DECIMALS"), "AMOUNT_DECIMALS", TON_DECIMALS)?;
        if amount_decimals != TON_DECIMALS {
            return Err(ConfigError::Invalid {
                key: "AMOUNT_DECIMALS",
                value: amount_decimals.to_string(),
                reason: format!("TON amounts always have {} decimals", TON_DECIMALS),
            });
        }

        let price_mode = parse_or(get("FRAGMENT_PRICE_MODE"), "FRAGMENT_PRICE_MODE", PriceMode::Auto)?;
        let price_http_url = parse_url(get("FRAGMENT_PRICE_HTTP_URL"), "FRAGMENT_PRICE_HTTP_URL")?;
        if price_mode == PriceMode::Http && price_http_url.is_none() {
            return Err(ConfigError::MissingPriceUrl);
        }

        let price_mock_raw = get("PRICE_MOCK_TON_PER_STAR").unwrap_or_else(|| DEFAULT_MOCK_TON_PER_STAR.to_string());
        let price_mock_ton_per_star = parse_decimal(&price_mock_raw, "PRICE_MOCK_TON_PER_STAR")?;
        if price_mock_ton_per_star <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "PRICE_MOCK_TON_PER_STAR",
                value: price_mock_raw,
                reason: "must be positive".to_string(),
            });
        }

        let fee_raw = get("PRICE_FEE_MULTIPLIER").unwrap_or_else(|| DEFAULT_FEE_MULTIPLIER.to_string());
        let fee_multiplier = parse_decimal(&fee_raw, "PRICE_FEE_MULTIPLIER")?;
        if fee_multiplier < Decimal::ONE {
            return Err(ConfigError::Invalid {
                key: "PRICE_FEE_MULTIPLIER",
                value: fee_raw,
                reason: "must be at least 1".to_string(),
            });
        }

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database_path = database_path_from_url(&database_url)?;

        let default_lang = get("DEFAULT_LANG")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|| "ru".to_string());
        if !SUPPORTED_LANGS.contains(&default_lang.as_str()) {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_LANG",
                value: default_lang,
                reason: format!("supported: {}", SUPPORTED_LANGS.join(", ")),
            });
        }

        Ok(Self {
            bot_token,
            ton_wallet_address,
            ton_api_provider,
            ton_api_key: get("TON_API_KEY"),
            ton_api_base_url,
            payment_poll_interval,
            payment_timeout,
            order_ttl,
            amount_decimals,
            price_mode,
            price_http_url,
            price_http_auth_header: get("FRAGMENT_PRICE_HTTP_AUTH_HEADER"),
            use_price_mock: parse_bool(get("USE_PRICE_MOCK"), "USE_PRICE_MOCK", false)?,
            price_mock_ton_per_star,
            fee_multiplier,
            fragment_auth_cookies_path: Some(
                get("FRAGMENT_AUTH_COOKIES_PATH").unwrap_or_else(|| "fragment_cookies.json".to_string()),
            ),
            playwright_headless: parse_bool(get("PLAYWRIGHT_HEADLESS"), "PLAYWRIGHT_HEADLESS", true)?,
            playwright_slowmo_ms: parse_or(get("PLAYWRIGHT_SLOWMO_MS"), "PLAYWRIGHT_SLOWMO_MS", 0)?,
            database_url,
            database_path,
            admin_password: get("ADMIN_PASSWORD"),
            admin_user_id: parse_opt(get("ADMIN_USER_ID"), "ADMIN_USER_ID")?,
            default_lang,
            bot_api_url: parse_url(get("BOT_API_URL"), "BOT_API_URL")?,
        })
    }

    /// Price mode after applying the USE_PRICE_MOCK override
    pub fn effective_price_mode(&self) -> PriceMode {
        if self.use_price_mock {
            PriceMode::Mock
        } else {
            self.price_mode
        }
    }

    /// Returns true if a custom Bot API server is configured (not api.telegram.org)
    pub fn uses_local_bot_api(&self) -> bool {
        self.bot_api_url
            .as_ref()
            .map(|url| url.host_str() != Some("api.telegram.org"))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &mask_secret(Some(self.bot_token.as_str())))
            .field("ton_wallet_address", &self.ton_wallet_address)
            .field("ton_api_provider", &self.ton_api_provider)
            .field("price_mode", &self.effective_price_mode())
            .field("price_http_url", &self.price_http_url.as_ref().map(Url::as_str))
            .field("price_mock_ton_per_star", &self.price_mock_ton_per_star)
            .field("fee_multiplier", &self.fee_multiplier)
            .field("database_path", &self.database_path)
            .field("admin_password", &mask_secret(self.admin_password.as_deref()))
            .field("default_lang", &self.default_lang)
            .finish_non_exhaustive()
    }
}

/// Turns a DATABASE_URL into a SQLite file path.
///
/// Accepts `sqlite+aiosqlite:///./stars.db`, `sqlite:///path`, `sqlite://path`
/// and bare paths. Other schemes are rejected since only SQLite is bundled.
pub fn database_path_from_url(url: &str) -> Result<String, ConfigError> {
    let path = if let Some(rest) = url.strip_prefix("sqlite+aiosqlite:///") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if url.contains("://") {
        return Err(ConfigError::Invalid {
            key: "DATABASE_URL",
            value: url.to_string(),
            reason: "only sqlite databases are supported".to_string(),
        });
    } else {
        url
    };

    if path.is_empty() {
        return Err(ConfigError::Invalid {
            key: "DATABASE_URL",
            value: url.to_string(),
            reason: "database path is empty".to_string(),
        });
    }
    Ok(path.to_string())
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    Ok(parse_opt(raw, key)?.unwrap_or(default))
}

fn parse_opt<T: FromStr>(raw: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        })
    })
    .transpose()
}

fn parse_secs(raw: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(raw, key, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(raw: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}

fn parse_url(raw: Option<String>, key: &'static str) -> Result<Option<Url>, ConfigError> {
    parse_opt(raw, key)
}

fn parse_decimal(raw: &str, key: &'static str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(raw).map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
