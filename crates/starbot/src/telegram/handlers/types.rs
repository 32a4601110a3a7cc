//! Handler types, dependencies, and user helpers

use std::sync::Arc;

use starcore::pricing::source::PriceProvider;
use starcore::storage::{get_connection, DbPool};
use starcore::Settings;
use teloxide::types::{CallbackQuery, Message};
use unic_langid::LanguageIdentifier;

use crate::i18n;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub settings: Arc<Settings>,
    pub db_pool: Arc<DbPool>,
    pub price_provider: Arc<dyn PriceProvider>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(settings: Arc<Settings>, db_pool: Arc<DbPool>, price_provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            settings,
            db_pool,
            price_provider,
        }
    }

    /// Language to talk to `user` in.
    ///
    /// Stored preference first, then the Telegram locale, then the configured default.
    pub fn lang_for(&self, user: &UserInfo) -> LanguageIdentifier {
        match get_connection(&self.db_pool) {
            Ok(conn) => i18n::user_lang(
                &conn,
                user.telegram_id,
                user.language_code.as_deref(),
                &self.settings.default_lang,
            ),
            Err(e) => {
                log::warn!("No DB connection while resolving language: {}", e);
                i18n::lang_from_code(i18n::detect_lang_code(
                    user.language_code.as_deref(),
                    &self.settings.default_lang,
                ))
            }
        }
    }

    /// Language code stored for new users
    pub fn initial_lang_code<'a>(&'a self, user: &UserInfo) -> &'a str {
        i18n::detect_lang_code(user.language_code.as_deref(), &self.settings.default_lang)
    }
}

/// The Telegram user behind an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl UserInfo {
    /// Extract user info from a Telegram message.
    ///
    /// Keyed by the sender, like button presses. Falls back to the chat id for
    /// messages without a sender.
    pub fn from_message(msg: &Message) -> Self {
        let telegram_id = msg
            .from
            .as_ref()
            .and_then(|u| i64::try_from(u.id.0).ok())
            .unwrap_or(msg.chat.id.0);
        Self {
            telegram_id,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            language_code: msg.from.as_ref().and_then(|u| u.language_code.clone()),
        }
    }

    /// Extract user info from a button press
    pub fn from_callback(q: &CallbackQuery) -> Self {
        Self {
            telegram_id: i64::try_from(q.from.id.0).unwrap_or_default(),
            username: q.from.username.clone(),
            language_code: q.from.language_code.clone(),
        }
    }
}
