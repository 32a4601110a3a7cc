//! SQLite persistence: pool, migrations, users, orders and payments

pub mod db;
pub mod migrations;
pub mod models;
pub mod orders;

// Re-exports for convenience
pub use db::{create_pool, get_connection, get_user, set_user_language, upsert_user, with_transaction, DbConnection, DbPool};
pub use models::{NewOrder, NewPayment, Order, OrderStatus, Payment, PaymentStatus, User};
pub use orders::{
    create_order, get_order_by_key, get_order_payments, get_payment, list_user_orders, record_payment,
    set_order_price, update_order_status, update_payment_status,
};
