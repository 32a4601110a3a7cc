//! Command handler implementations (/start)

use starcore::storage::{get_connection, upsert_user};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::purchase::send_quantity_prompt;
use super::types::{HandlerDeps, HandlerError, UserInfo};
use crate::i18n;
use crate::telegram::keyboards::main_menu;

/// Handle /start command
///
/// Registers the user (language from their Telegram profile when supported),
/// shows the buy keyboard and asks for a quantity.
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = UserInfo::from_message(msg);

    let db_user = {
        let conn = get_connection(&deps.db_pool)?;
        upsert_user(
            &conn,
            user.telegram_id,
            user.username.as_deref(),
            deps.initial_lang_code(&user),
        )?
    };
    let lang = i18n::lang_from_code(&db_user.language);

    log::info!(
        "👋 /start from user {} (@{}), language {}",
        user.telegram_id,
        user.username.as_deref().unwrap_or("-"),
        db_user.language
    );

    bot.send_message(msg.chat.id, i18n::t(&lang, "start.greeting"))
        .reply_markup(main_menu(&lang))
        .await?;
    send_quantity_prompt(bot, msg.chat.id, &lang).await
}
