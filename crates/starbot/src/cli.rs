use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use starcore::{PaymentLinks, Quote};

#[derive(Parser, Debug)]
#[command(name = "starbot")]
#[command(author, version, about = "Telegram bot selling Stars for TON via wallet deep links", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Create the database tables and exit
    InitDb,

    /// Price a quantity with the configured price source and print both payment links
    Quote {
        /// Number of stars
        quantity: u64,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Text printed by `starbot quote`
pub fn format_quote_report(quote: &Quote, rate: Decimal, source: &str, memo: &str, links: &PaymentLinks) -> String {
    format!(
        "Quantity:  {} stars\n\
         Rate:      {} TON/star ({})\n\
         Per star:  {} TON\n\
         Subtotal:  {} TON\n\
         Total:     {} TON ({} nanotons)\n\
         Memo:      {}\n\
         Wallet:    {}\n\
         Transfer:  {}",
        quote.quantity,
        rate,
        source,
        quote.per_unit,
        quote.subtotal,
        quote.total,
        quote.total.to_nanotons(),
        memo,
        links.wallet,
        links.transfer
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["starbot"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["starbot", "init-db"]).unwrap();
        assert_eq!(cli.command, Some(Commands::InitDb));

        let cli = Cli::try_parse_from(["starbot", "quote", "50"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Quote { quantity: 50 }));

        assert!(Cli::try_parse_from(["starbot", "quote", "many"]).is_err());
    }

    #[test]
    fn report_lists_amounts_and_links() {
        let rate = Decimal::from_str("0.006451").unwrap();
        let quote = starcore::quote(50, rate, Decimal::from_str("1.05").unwrap()).unwrap();
        let links = PaymentLinks::build("UQAbc", &quote.total, "Stars x50");

        let report = format_quote_report(&quote, rate, "mock", "Stars x50", &links);
        assert!(report.contains("Total:     0.3386775 TON (338677500 nanotons)"));
        assert!(report.contains("Subtotal:  0.32255 TON"));
        assert!(report.contains("ton://transfer/UQAbc?amount=338677500"));
    }
}
