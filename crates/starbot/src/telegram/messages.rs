//! Chat message texts that take arguments

use fluent_templates::fluent_bundle::FluentArgs;
use starcore::pricing::{MAX_STARS, MIN_STARS};
use starcore::Quote;
use teloxide::utils::html;
use unic_langid::LanguageIdentifier;

use crate::i18n;

/// "How many stars?" with the orderable bounds
pub fn quantity_prompt(lang: &LanguageIdentifier) -> String {
    i18n::t_args(lang, "purchase.prompt", &bounds_args())
}

/// Re-prompt after a quantity outside the bounds
pub fn out_of_range(lang: &LanguageIdentifier) -> String {
    i18n::t_args(lang, "purchase.out_of_range", &bounds_args())
}

fn bounds_args() -> FluentArgs<'static> {
    let mut args = FluentArgs::new();
    args.set("min", MIN_STARS.to_string());
    args.set("max", MAX_STARS.to_string());
    args
}

/// HTML body of the payment message.
///
/// The amount is the trimmed TON total; address and memo go in `<code>` so
/// they can be copied with a tap.
pub fn payment_summary(lang: &LanguageIdentifier, quote: &Quote, address: &str, memo: &str) -> String {
    let mut args = FluentArgs::new();
    args.set("quantity", quote.quantity.to_string());
    args.set("amount", quote.total.to_string());
    args.set("address", html::escape(address));
    args.set("memo", html::escape(memo));
    i18n::t_args(lang, "purchase.summary", &args)
}
