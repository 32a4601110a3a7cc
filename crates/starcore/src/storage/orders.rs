//! Orders and the payments recorded against them.
//!
//! Status changes are checked against the transition tables in
//! [`models`](crate::storage::models) before anything is written, so a
//! rejected transition leaves the row untouched.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::core::error::{AppError, AppResult};
use crate::pricing::TonAmount;
use crate::storage::models::{NewOrder, NewPayment, Order, OrderStatus, Payment, PaymentStatus};

const ORDER_COLUMNS: &str = "id, order_key, user_id, username, quantity, price_fragment_ton, price_out_ton, status, \
                             created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, order_id, status, amount_ton, comment, tx_hash, raw, created_at, updated_at";

/// Fresh public order identifier (32 lowercase hex chars)
pub fn generate_order_key() -> String {
    Uuid::new_v4().simple().to_string()
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        order_key: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        quantity: row.get(4)?,
        price_fragment_ton: row.get(5)?,
        price_out_ton: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        order_id: row.get(1)?,
        status: row.get(2)?,
        amount_ton: row.get(3)?,
        comment: row.get(4)?,
        tx_hash: row.get(5)?,
        raw: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Inserts a new order in `PENDING_PRICE`
pub fn create_order(conn: &Connection, order: &NewOrder) -> AppResult<Order> {
    if order.quantity == 0 {
        return Err(AppError::Validation("order quantity must be positive".to_string()));
    }

    let order_key = generate_order_key();
    conn.execute(
        "INSERT INTO orders (order_key, user_id, username, quantity, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            order_key,
            order.user_id,
            order.username,
            order.quantity,
            OrderStatus::PendingPrice
        ],
    )?;

    require_order(conn, &order_key)
}

pub fn get_order_by_key(conn: &Connection, order_key: &str) -> AppResult<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {} FROM orders WHERE order_key = ?1", ORDER_COLUMNS),
            [order_key],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

fn require_order(conn: &Connection, order_key: &str) -> AppResult<Order> {
    get_order_by_key(conn, order_key)?.ok_or_else(|| AppError::NotFound(format!("order {}", order_key)))
}

/// Most recent orders of a user, newest first
pub fn list_user_orders(conn: &Connection, user_id: i64, limit: u32) -> AppResult<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM orders WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        ORDER_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id, limit], order_from_row)?;

    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Stores the computed prices and moves the order to `PRICE_READY`
pub fn set_order_price(
    conn: &Connection,
    order_key: &str,
    price_fragment_ton: TonAmount,
    price_out_ton: TonAmount,
) -> AppResult<Order> {
    let order = require_order(conn, order_key)?;
    let next = order.status.transition(OrderStatus::PriceReady)?;

    let updated = conn.execute(
        "UPDATE orders
         SET price_fragment_ton = ?1, price_out_ton = ?2, status = ?3, updated_at = CURRENT_TIMESTAMP
         WHERE order_key = ?4 AND status = ?5",
        params![price_fragment_ton, price_out_ton, next, order_key, order.status],
    )?;
    ensure_updated(updated, "order", order.status.to_string(), next.to_string())?;

    require_order(conn, order_key)
}

/// Moves an order to `next` if the transition table allows it
pub fn update_order_status(conn: &Connection, order_key: &str, next: OrderStatus) -> AppResult<Order> {
    let order = require_order(conn, order_key)?;
    let next = order.status.transition(next)?;

    let updated = conn.execute(
        "UPDATE orders SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE order_key = ?2 AND status = ?3",
        params![next, order_key, order.status],
    )?;
    ensure_updated(updated, "order", order.status.to_string(), next.to_string())?;

    log::debug!("Order {} {} -> {}", order_key, order.status, next);
    require_order(conn, order_key)
}

/// The row changed status between our read and write
fn ensure_updated(updated: usize, entity: &'static str, from: String, to: String) -> AppResult<()> {
    if updated == 0 {
        return Err(AppError::InvalidTransition { entity, from, to });
    }
    Ok(())
}

/// Inserts a payment in `PENDING`. A duplicate `tx_hash` fails on the unique constraint.
pub fn record_payment(conn: &Connection, payment: &NewPayment) -> AppResult<Payment> {
    conn.execute(
        "INSERT INTO payments (order_id, status, amount_ton, comment, tx_hash, raw)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            payment.order_id,
            PaymentStatus::Pending,
            payment.amount_ton,
            payment.comment,
            payment.tx_hash,
            payment.raw
        ],
    )?;

    let id = conn.last_insert_rowid();
    require_payment(conn, id)
}

pub fn get_payment(conn: &Connection, payment_id: i64) -> AppResult<Option<Payment>> {
    let payment = conn
        .query_row(
            &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
            [payment_id],
            payment_from_row,
        )
        .optional()?;
    Ok(payment)
}

fn require_payment(conn: &Connection, payment_id: i64) -> AppResult<Payment> {
    get_payment(conn, payment_id)?.ok_or_else(|| AppError::NotFound(format!("payment {}", payment_id)))
}

/// Payments of an order, oldest first
pub fn get_order_payments(conn: &Connection, order_id: i64) -> AppResult<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM payments WHERE order_id = ?1 ORDER BY id ASC",
        PAYMENT_COLUMNS
    ))?;
    let rows = stmt.query_map([order_id], payment_from_row)?;

    let mut payments = Vec::new();
    for row in rows {
        payments.push(row?);
    }
    Ok(payments)
}

/// Moves a payment to `next` if the transition table allows it
pub fn update_payment_status(conn: &Connection, payment_id: i64, next: PaymentStatus) -> AppResult<Payment> {
    let payment = require_payment(conn, payment_id)?;
    let next = payment.status.transition(next)?;

    let updated = conn.execute(
        "UPDATE payments SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2 AND status = ?3",
        params![next, payment_id, payment.status],
    )?;
    ensure_updated(updated, "payment", payment.status.to_string(), next.to_string())?;

    require_payment(conn, payment_id)
}
