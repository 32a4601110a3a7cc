//! Payment message rendering and per-user language resolution

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use starbot::i18n::{lang_from_code, user_lang};
use starbot::telegram::messages::{out_of_range, payment_summary, quantity_prompt};
use starcore::storage::{create_pool, get_connection, upsert_user};
use starcore::{quote, Quote};
use std::str::FromStr;

fn minimum_quote() -> Quote {
    quote(
        50,
        Decimal::from_str("0.006451").unwrap(),
        Decimal::from_str("1.05").unwrap(),
    )
    .unwrap()
}

#[test]
fn summary_shows_trimmed_total_and_copyable_address() {
    let lang = lang_from_code("en");
    let text = payment_summary(&lang, &minimum_quote(), "UQAbc-_123", "Stars x50");

    assert!(text.contains("<b>50</b>"), "{}", text);
    assert!(text.contains("<b>0.3386775 TON</b>"), "{}", text);
    assert!(text.contains("<code>UQAbc-_123</code>"), "{}", text);
    assert!(text.contains("<code>Stars x50</code>"), "{}", text);
    assert!(!text.contains("\\n"));
}

#[test]
fn summary_escapes_html_in_address() {
    let lang = lang_from_code("ru");
    let text = payment_summary(&lang, &minimum_quote(), "<script>", "Stars x50");

    assert!(text.contains("<code>&lt;script&gt;</code>"), "{}", text);
}

#[test]
fn prompts_mention_bounds() {
    for code in ["ru", "en"] {
        let lang = lang_from_code(code);
        for text in [quantity_prompt(&lang), out_of_range(&lang)] {
            assert!(text.contains("50"), "{}", text);
            assert!(text.contains("1000000"), "{}", text);
        }
    }
}

#[test]
fn russian_and_english_differ() {
    assert_ne!(
        quantity_prompt(&lang_from_code("ru")),
        quantity_prompt(&lang_from_code("en"))
    );
}

#[test]
fn stored_language_wins_over_profile() {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(dir.path().join("stars.db").to_str().unwrap()).unwrap();
    let conn = get_connection(&pool).unwrap();

    upsert_user(&conn, 10, Some("anna"), "en").unwrap();

    assert_eq!(user_lang(&conn, 10, Some("ru"), "ru"), lang_from_code("en"));
    // Unknown users: Telegram locale when supported, otherwise the default
    assert_eq!(user_lang(&conn, 11, Some("en-US"), "ru"), lang_from_code("en"));
    assert_eq!(user_lang(&conn, 12, Some("fr"), "ru"), lang_from_code("ru"));
    assert_eq!(user_lang(&conn, 13, None, "en"), lang_from_code("en"));
}
