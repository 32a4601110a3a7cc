//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command registration in the Telegram UI

use std::time::Duration;

use reqwest::ClientBuilder;
use starcore::Settings;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::i18n;

/// Timeout for Bot API requests. Long polling waits up to 10s server-side.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать покупку звёзд")]
    Start,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot(settings: &Settings) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(REQUEST_TIMEOUT).build()?;
    let bot = Bot::with_client(settings.bot_token.clone(), client);

    let bot = match settings.bot_api_url {
        Some(ref url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI, per supported language
///
/// The Russian list doubles as the default for users with other locales.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    for (code, _) in i18n::SUPPORTED_LANGS {
        let lang = i18n::lang_from_code(code);
        let commands = vec![BotCommand::new("start", i18n::t(&lang, "commands.start"))];

        if *code == "ru" {
            bot.set_my_commands(commands.clone()).await?;
        }
        bot.set_my_commands(commands).language_code(code.to_string()).await?;
    }

    Ok(())
}
