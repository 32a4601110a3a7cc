use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use starbot::cli::{format_quote_report, Cli, Commands};
use starbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use starcore::core::config::{self, database_path_from_url, DEFAULT_DATABASE_URL};
use starcore::core::{init_logger, log_startup_diagnostics};
use starcore::links::stars_memo;
use starcore::pricing::source::build_price_provider;
use starcore::{create_pool, quote, validate_quantity, PaymentLinks, Settings};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, settings, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load .env first so LOG_FILE_PATH / LOG_LEVEL from it are honoured
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH, *config::LOG_LEVEL)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::InitDb) => run_init_db(),
        Some(Commands::Quote { quantity }) => run_quote(quantity).await,
    }
}

/// Create the tables and exit. Needs only DATABASE_URL.
fn run_init_db() -> Result<()> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let path = database_path_from_url(&url)?;

    create_pool(&path).map_err(|e| anyhow::anyhow!("Failed to initialize database {}: {}", path, e))?;
    log::info!("✅ Database ready at {}", path);
    Ok(())
}

/// Print the price and links for a quantity
async fn run_quote(quantity: u64) -> Result<()> {
    let settings = Settings::from_env()?;
    let quantity = validate_quantity(quantity)?;

    let provider = build_price_provider(&settings);
    let rate = provider.ton_per_star().await?;
    let quote = quote(quantity, rate, settings.fee_multiplier)?;

    let memo = stars_memo(quantity);
    let links = PaymentLinks::build(&settings.ton_wallet_address, &quote.total, &memo);

    println!(
        "{}",
        format_quote_report(&quote, rate, provider.name(), &memo, &links)
    );
    Ok(())
}

/// Run the bot with long polling
async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let settings = Arc::new(Settings::from_env()?);
    log_startup_diagnostics(&settings);

    let db_pool = Arc::new(
        create_pool(&settings.database_path).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    let price_provider = build_price_provider(&settings);
    log::info!("Price source: {}", price_provider.name());

    let bot = create_bot(&settings)?;

    bot.delete_webhook().drop_pending_updates(true).await?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let me = bot.get_me().await?;
    log::info!(
        "🤖 Bot @{} (id {}) is up",
        me.username.as_deref().unwrap_or("unknown"),
        me.id
    );

    let deps = HandlerDeps::new(Arc::clone(&settings), db_pool, price_provider);
    let handler = schema(deps);

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
