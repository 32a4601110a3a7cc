//! Quantity input, payment message, and the buttons under it

use starcore::links::stars_memo;
use starcore::pricing::{parse_quantity, QuantityError};
use starcore::storage::{
    create_order, get_connection, get_order_by_key, get_user, set_order_price, update_order_status, upsert_user,
    with_transaction, NewOrder, Order, OrderStatus,
};
use starcore::{quote, AppResult, PaymentLinks, Quote};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, Message, MessageId, ParseMode};
use unic_langid::LanguageIdentifier;

use super::types::{HandlerDeps, HandlerError, UserInfo};
use crate::i18n;
use crate::telegram::keyboards::{main_menu, payment_keyboard, CallbackAction};
use crate::telegram::messages;

/// Handles plain text in a private chat: the buy button or a quantity
pub(super) async fn handle_text(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user = UserInfo::from_message(msg);
    let lang = deps.lang_for(&user);

    if i18n::all_translations("buttons.buy").iter().any(|label| label == text.trim()) {
        return send_quantity_prompt(bot, msg.chat.id, &lang).await;
    }

    match parse_quantity(text) {
        Ok(quantity) => start_purchase(bot, msg.chat.id, &user, quantity, &lang, deps).await,
        Err(QuantityError::OutOfRange { .. }) => {
            log::info!("Quantity out of range from user {}: {:?}", user.telegram_id, text);
            bot.send_message(msg.chat.id, messages::out_of_range(&lang)).await?;
            Ok(())
        }
        Err(QuantityError::NotANumber) => send_quantity_prompt(bot, msg.chat.id, &lang).await,
    }
}

pub(super) async fn send_quantity_prompt(
    bot: &Bot,
    chat_id: ChatId,
    lang: &LanguageIdentifier,
) -> Result<(), HandlerError> {
    bot.send_message(chat_id, messages::quantity_prompt(lang)).await?;
    Ok(())
}

/// Creates the order, prices it, and sends the payment message
async fn start_purchase(
    bot: &Bot,
    chat_id: ChatId,
    user: &UserInfo,
    quantity: u32,
    lang: &LanguageIdentifier,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let order = {
        let mut conn = get_connection(&deps.db_pool)?;
        with_transaction(&mut conn, |tx| {
            let db_user = upsert_user(tx, user.telegram_id, user.username.as_deref(), deps.initial_lang_code(user))?;
            create_order(
                tx,
                &NewOrder {
                    user_id: db_user.id,
                    username: None,
                    quantity,
                },
            )
        })?
    };
    log::info!(
        "🛒 Order {} created: {} stars for user {}",
        order.order_key,
        quantity,
        user.telegram_id
    );

    let quote = match price_order(deps, quantity).await {
        Ok(quote) => quote,
        Err(e) => {
            log::error!("❌ Failed to price order {}: {}", order.order_key, e);
            let conn = get_connection(&deps.db_pool)?;
            update_order_status(&conn, &order.order_key, OrderStatus::Error)?;
            bot.send_message(chat_id, i18n::t(lang, "purchase.price_error")).await?;
            return Ok(());
        }
    };

    {
        let conn = get_connection(&deps.db_pool)?;
        set_order_price(&conn, &order.order_key, quote.per_unit, quote.total)?;
    }

    let memo = stars_memo(quantity);
    let address = &deps.settings.ton_wallet_address;
    let links = PaymentLinks::build(address, &quote.total, &memo);
    let keyboard = payment_keyboard(lang, &links, &order.order_key)?;

    let sent = bot
        .send_message(chat_id, messages::payment_summary(lang, &quote, address, &memo))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await;
    if let Err(e) = sent {
        log::error!("❌ Payment message for order {} was not delivered: {}", order.order_key, e);
        let conn = get_connection(&deps.db_pool)?;
        update_order_status(&conn, &order.order_key, OrderStatus::Error)?;
        return Err(e.into());
    }

    let conn = get_connection(&deps.db_pool)?;
    update_order_status(&conn, &order.order_key, OrderStatus::WaitingPayment)?;
    log::info!("💎 Order {} awaiting {} TON", order.order_key, quote.total);

    Ok(())
}

async fn price_order(deps: &HandlerDeps, quantity: u32) -> AppResult<Quote> {
    let rate = deps.price_provider.ton_per_star().await?;
    Ok(quote(quantity, rate, deps.settings.fee_multiplier)?)
}

/// Looks up an order and checks it belongs to the user pressing the button
fn find_user_order(deps: &HandlerDeps, user: &UserInfo, order_key: &str) -> AppResult<Option<Order>> {
    let conn = get_connection(&deps.db_pool)?;
    let Some(db_user) = get_user(&conn, user.telegram_id)? else {
        return Ok(None);
    };
    Ok(get_order_by_key(&conn, order_key)?.filter(|order| order.user_id == db_user.id))
}

/// Cancels the order if it is still open. Returns whether it was canceled.
fn cancel_order(deps: &HandlerDeps, user: &UserInfo, order_key: &str) -> AppResult<bool> {
    let Some(order) = find_user_order(deps, user, order_key)? else {
        return Ok(false);
    };
    if !order.status.can_transition_to(OrderStatus::Canceled) {
        log::info!("Order {} is {} and cannot be canceled", order_key, order.status);
        return Ok(false);
    }

    let conn = get_connection(&deps.db_pool)?;
    update_order_status(&conn, order_key, OrderStatus::Canceled)?;
    log::info!("🚫 Order {} canceled by user {}", order_key, user.telegram_id);
    Ok(true)
}

async fn remove_inline_keyboard(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.edit_message_reply_markup(chat_id, message_id).await {
        log::warn!("Failed to remove inline keyboard: {}", e);
    }
}

/// Handles the check / change quantity / cancel buttons
pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::warn!("Unknown callback data {:?} from user {}", q.data, q.from.id);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let user = UserInfo::from_callback(q);
    let lang = deps.lang_for(&user);
    let chat_id = q.message.as_ref().map(|m| m.chat().id);
    let message_id = q.message.as_ref().map(|m| m.id());

    log::info!("🔘 Callback {} from user {}", action.data(), user.telegram_id);

    match action {
        CallbackAction::Check(_) => {
            bot.answer_callback_query(q.id.clone())
                .text(i18n::t(&lang, "purchase.check_pending"))
                .show_alert(true)
                .await?;
        }
        CallbackAction::ChangeQuantity(ref order_key) => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let (Some(chat_id), Some(message_id)) = (chat_id, message_id) {
                remove_inline_keyboard(bot, chat_id, message_id).await;
            }
            cancel_order(deps, &user, order_key)?;
            if let Some(chat_id) = chat_id {
                send_quantity_prompt(bot, chat_id, &lang).await?;
            }
        }
        CallbackAction::Cancel(ref order_key) => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let (Some(chat_id), Some(message_id)) = (chat_id, message_id) {
                remove_inline_keyboard(bot, chat_id, message_id).await;
            }
            let key = if cancel_order(deps, &user, order_key)? {
                "purchase.canceled"
            } else {
                "purchase.order_missing"
            };
            if let Some(chat_id) = chat_id {
                bot.send_message(chat_id, i18n::t(&lang, key))
                    .reply_markup(main_menu(&lang))
                    .await?;
            }
        }
    }

    Ok(())
}
