//! Wallet deep links that pre-fill a TON transfer.
//!
//! Two forms are produced for the same payment:
//! - `tg://resolve?domain=wallet&attach=send&...` opens Telegram Wallet
//! - `ton://transfer/<address>?amount=<nanotons>&...` for any TON wallet

use url::form_urlencoded;

use crate::pricing::TonAmount;

/// Transfer comment for an order of `quantity` stars
pub fn stars_memo(quantity: u32) -> String {
    format!("Stars x{}", quantity)
}

/// Telegram Wallet deep link. `amount` is a trimmed decimal in TON.
///
/// ```
/// use starcore::links::build_tg_wallet_link;
/// use starcore::TonAmount;
///
/// let amount: TonAmount = "0.3386775".parse().unwrap();
/// assert_eq!(
///     build_tg_wallet_link("UQAbc", &amount, "Stars x50"),
///     "tg://resolve?domain=wallet&attach=send&asset=TON&address=UQAbc&amount=0.3386775&comment=Stars+x50"
/// );
/// ```
pub fn build_tg_wallet_link(address: &str, amount: &TonAmount, comment: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("domain", "wallet")
        .append_pair("attach", "send")
        .append_pair("asset", "TON")
        .append_pair("address", address)
        .append_pair("amount", &amount.to_string());
    if !comment.is_empty() {
        query.append_pair("comment", comment);
    }
    format!("tg://resolve?{}", query.finish())
}

/// Generic `ton://transfer` link. `amount` is sent as integer nanotons.
pub fn build_ton_transfer_link(address: &str, amount: &TonAmount, comment: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("amount", &amount.to_nanotons().to_string());
    if !comment.is_empty() {
        query.append_pair("text", comment).append_pair("comment", comment);
    }
    format!("ton://transfer/{}?{}", urlencoding::encode(address), query.finish())
}

/// Both links for one receiving wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinks {
    pub wallet: String,
    pub transfer: String,
}

impl PaymentLinks {
    pub fn build(address: &str, amount: &TonAmount, comment: &str) -> Self {
        Self {
            wallet: build_tg_wallet_link(address, amount, comment),
            transfer: build_ton_transfer_link(address, amount, comment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn amount(s: &str) -> TonAmount {
        s.parse().unwrap()
    }

    #[test]
    fn memo_format() {
        assert_eq!(stars_memo(50), "Stars x50");
        assert_eq!(stars_memo(1_000_000), "Stars x1000000");
    }

    #[test]
    fn tg_link_trims_amount_and_encodes_comment() {
        let link = build_tg_wallet_link("UQAbc-_123", &amount("0.322550000"), "Stars x50");
        assert_eq!(
            link,
            "tg://resolve?domain=wallet&attach=send&asset=TON&address=UQAbc-_123&amount=0.32255&comment=Stars+x50"
        );
    }

    #[test]
    fn tg_link_without_comment() {
        let link = build_tg_wallet_link("UQAbc", &amount("1"), "");
        assert_eq!(link, "tg://resolve?domain=wallet&attach=send&asset=TON&address=UQAbc&amount=1");
    }

    #[test]
    fn ton_link_uses_nanotons() {
        let link = build_ton_transfer_link("UQAbc-_123", &amount("0.32255"), "Stars x50");
        assert_eq!(
            link,
            "ton://transfer/UQAbc-_123?amount=322550000&text=Stars+x50&comment=Stars+x50"
        );
    }

    #[test]
    fn ton_link_percent_encodes_address() {
        let link = build_ton_transfer_link("EQ+a/b=", &amount("0.5"), "");
        assert_eq!(link, "ton://transfer/EQ%2Ba%2Fb%3D?amount=500000000");
    }

    #[test]
    fn comment_special_characters_are_encoded() {
        let link = build_tg_wallet_link("UQ", &amount("0.1"), "a&b=c ?");
        assert!(link.ends_with("&comment=a%26b%3Dc+%3F"), "{}", link);
    }

    #[test]
    fn links_are_idempotent() {
        let a = amount("0.3386775");
        assert_eq!(
            PaymentLinks::build("UQAbc", &a, "Stars x50"),
            PaymentLinks::build("UQAbc", &a, "Stars x50")
        );
    }
}
