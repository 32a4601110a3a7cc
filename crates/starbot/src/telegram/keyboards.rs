//! Reply and inline keyboards, plus the callback data they carry

use starcore::PaymentLinks;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use unic_langid::LanguageIdentifier;
use url::Url;

use crate::i18n;

/// Action behind an inline button. Serialized as `<verb>:<order_key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Check(String),
    ChangeQuantity(String),
    Cancel(String),
}

impl CallbackAction {
    const CHECK: &'static str = "check";
    const CHANGE_QUANTITY: &'static str = "change_qty";
    const CANCEL: &'static str = "cancel";

    /// Parses callback data; `None` for anything this bot did not produce
    pub fn parse(data: &str) -> Option<Self> {
        let (verb, order_key) = data.split_once(':')?;
        if order_key.is_empty() {
            return None;
        }
        let order_key = order_key.to_string();
        match verb {
            Self::CHECK => Some(Self::Check(order_key)),
            Self::CHANGE_QUANTITY => Some(Self::ChangeQuantity(order_key)),
            Self::CANCEL => Some(Self::Cancel(order_key)),
            _ => None,
        }
    }

    pub fn data(&self) -> String {
        let (verb, order_key) = match self {
            Self::Check(key) => (Self::CHECK, key),
            Self::ChangeQuantity(key) => (Self::CHANGE_QUANTITY, key),
            Self::Cancel(key) => (Self::CANCEL, key),
        };
        format!("{}:{}", verb, order_key)
    }

    pub fn order_key(&self) -> &str {
        match self {
            Self::Check(key) | Self::ChangeQuantity(key) | Self::Cancel(key) => key,
        }
    }
}

/// Persistent reply keyboard with the "Buy stars" button
pub fn main_menu(lang: &LanguageIdentifier) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(i18n::t(lang, "buttons.buy"))]])
        .resize_keyboard()
        .input_field_placeholder(i18n::t(lang, "menu.placeholder"))
}

/// Inline keyboard under a payment message
///
/// # Errors
/// Returns an error if either deep link is not a valid URL.
pub fn payment_keyboard(
    lang: &LanguageIdentifier,
    links: &PaymentLinks,
    order_key: &str,
) -> Result<InlineKeyboardMarkup, url::ParseError> {
    let wallet = Url::parse(&links.wallet)?;
    let transfer = Url::parse(&links.transfer)?;
    let key = order_key.to_string();

    Ok(InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url(i18n::t(lang, "buttons.wallet"), wallet)],
        vec![InlineKeyboardButton::url(i18n::t(lang, "buttons.ton"), transfer)],
        vec![InlineKeyboardButton::callback(
            i18n::t(lang, "buttons.check"),
            CallbackAction::Check(key.clone()).data(),
        )],
        vec![
            InlineKeyboardButton::callback(
                i18n::t(lang, "buttons.change_qty"),
                CallbackAction::ChangeQuantity(key.clone()).data(),
            ),
            InlineKeyboardButton::callback(i18n::t(lang, "buttons.cancel"), CallbackAction::Cancel(key).data()),
        ],
    ]))
}
