//! Purchase flow through the real handler tree against a mocked Bot API
//!
//! Updates are dispatched into `schema(deps)`; the Telegram API is served by
//! wiremock, and the stored order status is checked after each step.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::ops::ControlFlow;
use std::sync::Arc;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{Me, Update};
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use starbot::telegram::{schema, HandlerDeps, HandlerError};
use starcore::pricing::source::{MockPrice, PriceProvider, PriceSourceError};
use starcore::storage::{
    create_pool, get_connection, get_order_by_key, get_user, list_user_orders, Order, OrderStatus,
};
use starcore::Settings;

const BUYER_ID: i64 = 123456789;
const OTHER_ID: i64 = 555000111;
const WALLET: &str = "UQTestWallet";

/// Price source that is always down
struct UnavailablePrice;

#[async_trait]
impl PriceProvider for UnavailablePrice {
    async fn ton_per_star(&self) -> Result<Decimal, PriceSourceError> {
        Err(PriceSourceError::BadValue("service unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

struct HandlerTest {
    mock_server: MockServer,
    bot: Bot,
    me: Me,
    deps: HandlerDeps,
    _dir: tempfile::TempDir,
}

impl HandlerTest {
    async fn new() -> Self {
        let provider: Arc<dyn PriceProvider> = Arc::new(MockPrice::new("0.006451".parse().unwrap()));
        Self::with_price(provider).await
    }

    async fn with_price(price_provider: Arc<dyn PriceProvider>) -> Self {
        let mock_server = MockServer::start().await;
        let bot = Bot::new("test_token_12345:ABCDEF").set_api_url(mock_server.uri().parse().unwrap());

        let dir = tempfile::tempdir().unwrap();
        let db_pool = Arc::new(create_pool(dir.path().join("stars.db").to_str().unwrap()).unwrap());

        let settings = Settings::from_lookup(|key| match key {
            "BOT_TOKEN" => Some("test_token_12345:ABCDEF".to_string()),
            "TON_WALLET_ADDRESS" => Some(WALLET.to_string()),
            "FRAGMENT_PRICE_MODE" => Some("mock".to_string()),
            _ => None,
        })
        .unwrap();

        let me: Me = serde_json::from_value(serde_json::json!({
            "id": 987654321,
            "is_bot": true,
            "first_name": "StarsBot",
            "username": "stars_test_bot",
            "can_join_groups": false,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false
        }))
        .unwrap();

        Self {
            mock_server,
            bot,
            me,
            deps: HandlerDeps::new(Arc::new(settings), db_pool, price_provider),
            _dir: dir,
        }
    }

    /// Answers every Bot API call with a plausible success
    async fn mock_telegram_api(&self) {
        let sent = serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 42,
                "from": { "id": 987654321, "is_bot": true, "first_name": "StarsBot" },
                "chat": { "id": BUYER_ID, "type": "private", "first_name": "Test" },
                "date": 1735992000,
                "text": "Response"
            }
        });
        for api_method in ["sendMessage", "editMessageReplyMarkup"] {
            Mock::given(method("POST"))
                .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
                .respond_with(ResponseTemplate::new(200).set_body_json(sent.clone()))
                .mount(&self.mock_server)
                .await;
        }

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/answerCallbackQuery$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "result": true })))
            .mount(&self.mock_server)
            .await;
    }

    /// Rejects messages that carry an inline keyboard, i.e. the payment message
    async fn reject_payment_message(&self) {
        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/sendMessage$"))
            .and(body_string_contains("inline_keyboard"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .with_priority(1)
            .mount(&self.mock_server)
            .await;
    }

    fn text_update(text: &str, chat: serde_json::Value, user_id: i64) -> Update {
        serde_json::from_str(&serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "date": 1735992000,
                "chat": chat,
                "from": {
                    "id": user_id,
                    "is_bot": false,
                    "first_name": "Test",
                    "username": "buyer",
                    "language_code": "en"
                },
                "text": text
            }
        }).to_string())
        .unwrap()
    }

    fn private_text(text: &str, user_id: i64) -> Update {
        let chat = serde_json::json!({ "id": user_id, "type": "private", "first_name": "Test" });
        Self::text_update(text, chat, user_id)
    }

    fn callback(data: &str, user_id: i64) -> Update {
        serde_json::from_str(&serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "callback_123",
                "from": {
                    "id": user_id,
                    "is_bot": false,
                    "first_name": "Test",
                    "language_code": "en"
                },
                "message": {
                    "message_id": 42,
                    "date": 1735992000,
                    "chat": { "id": user_id, "type": "private", "first_name": "Test" },
                    "from": { "id": 987654321, "is_bot": true, "first_name": "StarsBot" },
                    "text": "Payment details"
                },
                "chat_instance": "chat_instance_123",
                "data": data
            }
        }).to_string())
        .unwrap()
    }

    /// Runs one update through the handler tree. `None` when no branch took it.
    async fn dispatch(&self, update: Update) -> Option<Result<(), HandlerError>> {
        let handler = schema(self.deps.clone());
        match handler
            .dispatch(dptree::deps![self.bot.clone(), self.me.clone(), update])
            .await
        {
            ControlFlow::Break(result) => Some(result),
            ControlFlow::Continue(_) => None,
        }
    }

    fn latest_order(&self, telegram_id: i64) -> Order {
        let conn = get_connection(&self.deps.db_pool).unwrap();
        let user = get_user(&conn, telegram_id).unwrap().expect("user stored");
        list_user_orders(&conn, user.id, 1)
            .unwrap()
            .into_iter()
            .next()
            .expect("order stored")
    }

    fn order(&self, order_key: &str) -> Order {
        let conn = get_connection(&self.deps.db_pool).unwrap();
        get_order_by_key(&conn, order_key).unwrap().expect("order stored")
    }

    async fn requests_to(&self, api_method: &str) -> Vec<Request> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().to_lowercase().ends_with(&api_method.to_lowercase()))
            .collect()
    }

    async fn bodies_to(&self, api_method: &str) -> Vec<String> {
        self.requests_to(api_method)
            .await
            .into_iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }
}

#[tokio::test]
async fn quantity_creates_priced_order_awaiting_payment() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    let order = test.latest_order(BUYER_ID);
    assert_eq!(order.status, OrderStatus::WaitingPayment);
    assert_eq!(order.quantity, 50);
    assert_eq!(order.price_fragment_ton.map(|p| p.to_string()), Some("0.006451".to_string()));
    assert_eq!(order.price_out_ton.map(|p| p.to_string()), Some("0.3386775".to_string()));

    let bodies = test.bodies_to("sendMessage").await;
    let payment = bodies
        .iter()
        .find(|b| b.contains("inline_keyboard"))
        .expect("payment message sent");
    assert!(payment.contains("0.3386775 TON"), "{}", payment);
    assert!(payment.contains(WALLET), "{}", payment);
    assert!(payment.contains("ton://transfer/UQTestWallet?amount=338677500"), "{}", payment);
    assert!(payment.contains(&format!("check:{}", order.order_key)), "{}", payment);
    assert!(payment.contains(&format!("cancel:{}", order.order_key)), "{}", payment);
}

#[tokio::test]
async fn out_of_range_quantity_creates_no_order() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::private_text("10", BUYER_ID)).await;
    assert!(matches!(result, Some(Ok(()))));

    let conn = get_connection(&test.deps.db_pool).unwrap();
    assert!(get_user(&conn, BUYER_ID).unwrap().is_none());

    let bodies = test.bodies_to("sendMessage").await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("between 50 and 1000000"), "{}", bodies[0]);
}

#[tokio::test]
async fn price_source_failure_marks_order_as_error() {
    let test = HandlerTest::with_price(Arc::new(UnavailablePrice)).await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::private_text("100", BUYER_ID)).await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    let order = test.latest_order(BUYER_ID);
    assert_eq!(order.status, OrderStatus::Error);
    assert_eq!(order.price_out_ton, None);

    let bodies = test.bodies_to("sendMessage").await;
    assert!(bodies.iter().any(|b| b.contains("Could not compute the price")));
    assert!(!bodies.iter().any(|b| b.contains("inline_keyboard")));
}

#[tokio::test]
async fn undelivered_payment_message_marks_order_as_error() {
    let test = HandlerTest::new().await;
    test.reject_payment_message().await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    assert!(matches!(result, Some(Err(_))), "{:?}", result);

    let order = test.latest_order(BUYER_ID);
    assert_eq!(order.status, OrderStatus::Error);
}

#[tokio::test]
async fn check_payment_answers_with_alert() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;
    test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    let order = test.latest_order(BUYER_ID);

    let result = test
        .dispatch(HandlerTest::callback(&format!("check:{}", order.order_key), BUYER_ID))
        .await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    let answers = test.bodies_to("answerCallbackQuery").await;
    assert_eq!(answers.len(), 1);
    assert!(answers[0].contains("\"show_alert\":true"), "{}", answers[0]);
    assert_eq!(test.order(&order.order_key).status, OrderStatus::WaitingPayment);
}

#[tokio::test]
async fn change_quantity_cancels_and_prompts_again() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;
    test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    let order = test.latest_order(BUYER_ID);

    let result = test
        .dispatch(HandlerTest::callback(&format!("change_qty:{}", order.order_key), BUYER_ID))
        .await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    assert_eq!(test.order(&order.order_key).status, OrderStatus::Canceled);
    assert_eq!(test.requests_to("editMessageReplyMarkup").await.len(), 1);

    let bodies = test.bodies_to("sendMessage").await;
    assert!(bodies.last().is_some_and(|b| b.contains("How many stars")), "{:?}", bodies.last());
}

#[tokio::test]
async fn cancel_closes_order_and_confirms() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;
    test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    let order = test.latest_order(BUYER_ID);

    let result = test
        .dispatch(HandlerTest::callback(&format!("cancel:{}", order.order_key), BUYER_ID))
        .await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    assert_eq!(test.order(&order.order_key).status, OrderStatus::Canceled);
    assert_eq!(test.requests_to("editMessageReplyMarkup").await.len(), 1);

    let bodies = test.bodies_to("sendMessage").await;
    assert!(bodies.last().is_some_and(|b| b.contains("Order canceled")), "{:?}", bodies.last());
}

#[tokio::test]
async fn other_user_cannot_cancel_order() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;
    test.dispatch(HandlerTest::private_text("50", BUYER_ID)).await;
    test.dispatch(HandlerTest::private_text("60", OTHER_ID)).await;
    let order = test.latest_order(BUYER_ID);

    let result = test
        .dispatch(HandlerTest::callback(&format!("cancel:{}", order.order_key), OTHER_ID))
        .await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    assert_eq!(test.order(&order.order_key).status, OrderStatus::WaitingPayment);
    let bodies = test.bodies_to("sendMessage").await;
    assert!(bodies.last().is_some_and(|b| b.contains("Order not found")), "{:?}", bodies.last());
}

#[tokio::test]
async fn unknown_callback_is_answered_silently() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::callback("refund:whatever", BUYER_ID)).await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    let answers = test.bodies_to("answerCallbackQuery").await;
    assert_eq!(answers.len(), 1);
    assert!(test.bodies_to("sendMessage").await.is_empty());
}

#[tokio::test]
async fn start_registers_sender_in_private_chat() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;

    let result = test.dispatch(HandlerTest::private_text("/start", BUYER_ID)).await;
    assert!(matches!(result, Some(Ok(()))), "{:?}", result);

    let conn = get_connection(&test.deps.db_pool).unwrap();
    let user = get_user(&conn, BUYER_ID).unwrap().expect("user stored");
    assert_eq!(user.language, "en");
    assert_eq!(test.bodies_to("sendMessage").await.len(), 2);
}

#[tokio::test]
async fn start_in_group_is_ignored() {
    let test = HandlerTest::new().await;
    test.mock_telegram_api().await;

    let group_id = -1001234567890_i64;
    let chat = serde_json::json!({ "id": group_id, "type": "supergroup", "title": "Chat" });
    let result = test.dispatch(HandlerTest::text_update("/start", chat, BUYER_ID)).await;
    assert!(result.is_none(), "{:?}", result);

    let conn = get_connection(&test.deps.db_pool).unwrap();
    assert!(get_user(&conn, group_id).unwrap().is_none());
    assert!(get_user(&conn, BUYER_ID).unwrap().is_none());
    assert!(test.requests_to("sendMessage").await.is_empty());
}
