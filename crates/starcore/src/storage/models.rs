//! Persisted records and their status machines

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use strum::{Display, EnumIter, EnumString};

use crate::core::error::{AppError, AppResult};
use crate::pricing::TonAmount;

/// Lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPrice,
    PriceReady,
    WaitingPayment,
    Paid,
    GiftSent,
    Canceled,
    Expired,
    Error,
}

impl OrderStatus {
    /// States reachable in one step
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingPrice => &[PriceReady, Canceled, Error],
            PriceReady => &[WaitingPayment, Canceled, Expired, Error],
            WaitingPayment => &[Paid, Canceled, Expired, Error],
            Paid => &[GiftSent, Error],
            GiftSent | Canceled | Expired | Error => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns `next` if the transition is allowed
    pub fn transition(self, next: OrderStatus) -> AppResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                entity: "order",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Lifecycle of an incoming payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Partial,
    Timeout,
    Refunded,
}

impl PaymentStatus {
    pub fn allowed_next(self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Confirmed, Partial, Timeout],
            Partial => &[Confirmed, Timeout, Refunded],
            Confirmed | Timeout => &[Refunded],
            Refunded => &[],
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn transition(self, next: PaymentStatus) -> AppResult<PaymentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                entity: "payment",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.to_string()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: strum::ParseError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sql_text_enum!(OrderStatus);
sql_text_enum!(PaymentStatus);

impl ToSql for TonAmount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_fixed_string()))
    }
}

impl FromSql for TonAmount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::pricing::PricingError| FromSqlError::Other(Box::new(e)))
    }
}

/// A Telegram user known to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub language: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    /// Public identifier used in callback data
    pub order_key: String,
    pub user_id: i64,
    /// Recipient username, if different from the buyer
    pub username: Option<String>,
    pub quantity: u32,
    /// Source price of one star
    pub price_fragment_ton: Option<TonAmount>,
    /// Amount the user pays, fee included
    pub price_out_ton: Option<TonAmount>,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub username: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub status: PaymentStatus,
    pub amount_ton: TonAmount,
    pub comment: String,
    pub tx_hash: Option<String>,
    /// Provider payload as received
    pub raw: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub amount_ton: TonAmount,
    pub comment: String,
    pub tx_hash: Option<String>,
    pub raw: Option<String>,
}
