use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::core::error::{AppError, AppResult};
use crate::storage::migrations::run_migrations;
use crate::storage::models::User;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections, enables foreign
/// keys on every connection, and applies schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use starcore::storage;
///
/// let pool = storage::create_pool("stars.db")?;
/// # Ok::<(), starcore::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager =
        SqliteConnectionManager::file(database_path).with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

/// Runs `f` inside a transaction.
///
/// Commits when `f` returns `Ok`. On `Err` the transaction is dropped, which
/// rolls it back, and the error is returned unchanged.
pub fn with_transaction<T, E, F>(conn: &mut Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

const USER_COLUMNS: &str = "id, telegram_id, username, language, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        language: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Creates the user or refreshes their username.
///
/// `language` is only used for new rows; an existing preference is kept.
pub fn upsert_user(conn: &Connection, telegram_id: i64, username: Option<&str>, language: &str) -> AppResult<User> {
    conn.execute(
        "INSERT INTO users (telegram_id, username, language) VALUES (?1, ?2, ?3)
         ON CONFLICT(telegram_id) DO UPDATE SET
             username = excluded.username,
             updated_at = CURRENT_TIMESTAMP",
        params![telegram_id, username, language],
    )?;

    get_user(conn, telegram_id)?.ok_or_else(|| AppError::NotFound(format!("user {}", telegram_id)))
}

pub fn get_user(conn: &Connection, telegram_id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS),
            [telegram_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn set_user_language(conn: &Connection, telegram_id: i64, language: &str) -> AppResult<()> {
    let updated = conn.execute(
        "UPDATE users SET language = ?1, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = ?2",
        params![language, telegram_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound(format!("user {}", telegram_id)));
    }
    Ok(())
}
