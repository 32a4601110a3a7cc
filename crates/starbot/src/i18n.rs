use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use starcore::storage;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "ru",
        // Keep wallet addresses and amounts free of bidi marks so they copy cleanly
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("ru", "Русский"), ("en", "English")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "ru".parse().unwrap_or_default());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    is_language_supported(code)
        .and_then(|c| c.parse().ok())
        .unwrap_or_else(|| DEFAULT_LANG.clone())
}

/// Checks if a language code is supported by the bot.
/// Returns the normalized language code if supported, None otherwise.
pub fn is_language_supported(code: &str) -> Option<&'static str> {
    // "en-US" -> "en", "ru-RU" -> "ru"
    let normalized = code.split(['-', '_']).next().unwrap_or(code).to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&normalized))
        .map(|(c, _)| *c)
}

/// Picks the language code for a user without a stored preference:
/// their Telegram locale when supported, otherwise `default_code`.
pub fn detect_lang_code<'a>(telegram_lang_code: Option<&str>, default_code: &'a str) -> &'a str {
    telegram_lang_code.and_then(is_language_supported).unwrap_or(default_code)
}

/// Resolves the language for a user from the database, falling back to the
/// Telegram locale and then to `default_code`.
pub fn user_lang(
    conn: &storage::DbConnection,
    telegram_id: i64,
    telegram_lang_code: Option<&str>,
    default_code: &str,
) -> LanguageIdentifier {
    match storage::get_user(conn, telegram_id) {
        Ok(Some(user)) => lang_from_code(&user.language),
        Ok(None) => lang_from_code(detect_lang_code(telegram_lang_code, default_code)),
        Err(e) => {
            log::warn!("Failed to read language for user {}: {}", telegram_id, e);
            lang_from_code(detect_lang_code(telegram_lang_code, default_code))
        }
    }
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let text = LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    text.replace("\\n", "\n")
}

/// All translations of `key`, one per supported language.
///
/// Used to recognise reply-keyboard button presses regardless of the language
/// the keyboard was rendered in.
pub fn all_translations(key: &str) -> Vec<String> {
    SUPPORTED_LANGS
        .iter()
        .map(|(code, _)| t(&lang_from_code(code), key))
        .collect()
}
