// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL adapter for the northern hemisphere.
//!
//! One table, keyed by the user id:
//! ```sql
//! CREATE TABLE users (
//!   id VARCHAR(64) PRIMARY KEY,
//!   username VARCHAR(255) NOT NULL UNIQUE,
//!   email VARCHAR(255) NOT NULL UNIQUE,
//!   password VARCHAR(255) NOT NULL,
//!   latitude DOUBLE NOT NULL,
//!   longitude DOUBLE NOT NULL,
//!   browser_language VARCHAR(35)
//! )
//! ```
//!
//! Every call acquires its own connection from the pool and hands it back when
//! the guard drops, so release happens on success, on query errors and on early
//! returns alike.
//!
//! ## sqlx Any Driver Quirks
//!
//! MySQL text columns may come back as bytes through the `Any` driver, so text
//! reads try `String` first and fall back to UTF-8 decoding of `Vec<u8>`.

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool, Row};
use std::sync::Once;
use std::time::Duration;
use tracing::debug;

use super::traits::{RunResult, StorageError};
use crate::resilience::retry::{retry, RetryConfig};
use crate::user::{User, UserPatch};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

const SELECT_COLUMNS: &str =
    "SELECT id, username, email, password, latitude, longitude, browser_language FROM users";

/// Connection settings for [`SqlUserStore`].
#[derive(Debug, Clone)]
pub struct SqlStoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for SqlStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

pub struct SqlUserStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlUserStore {
    /// Connect and bootstrap the schema, retrying with the startup policy
    /// (fails fast if the URL is wrong).
    pub async fn new(connection_string: &str, options: &SqlStoreOptions) -> Result<Self, StorageError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(options.max_connections)
                .acquire_timeout(options.acquire_timeout)
                .connect(connection_string)
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))
        })
        .await?;

        let store = Self { pool, is_sqlite };

        if is_sqlite {
            store.enable_wal_mode().await?;
        }

        store.init_schema().await?;
        Ok(store)
    }

    async fn acquire(&self) -> Result<PoolConnection<Any>, StorageError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    /// Readers don't block the writer under WAL.
    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        let mut conn = self.acquire().await?;
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let sql = if self.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                browser_language TEXT
            )
            "#
        } else {
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(64) PRIMARY KEY,
                username VARCHAR(255) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password VARCHAR(255) NOT NULL,
                latitude DOUBLE NOT NULL,
                longitude DOUBLE NOT NULL,
                browser_language VARCHAR(35)
            )
            "#
        };

        retry("sql_init_schema", &RetryConfig::startup(), || async {
            let mut conn = self.acquire().await?;
            sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        Ok(())
    }

    /// Every row in the table.
    pub async fn fetch_all(&self) -> Result<Vec<User>, StorageError> {
        let mut conn = self.acquire().await?;
        let rows = sqlx::query(SELECT_COLUMNS)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn fetch_one(&self, id: &str) -> Result<Option<User>, StorageError> {
        let mut conn = self.acquire().await?;
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn insert(&self, user: &User) -> Result<RunResult, StorageError> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password, latitude, longitude, browser_language)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.latitude)
        .bind(user.longitude)
        .bind(&user.browser_language)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(RunResult { rows_affected: result.rows_affected() })
    }

    /// `UPDATE users SET <patched columns> WHERE id = ?`.
    ///
    /// An empty patch issues no statement and reports zero affected rows.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<RunResult, StorageError> {
        let columns = patched_columns(patch);
        if columns.is_empty() {
            return Ok(RunResult::default());
        }

        let set_clause: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        let sql = format!("UPDATE users SET {} WHERE id = ?", set_clause.join(", "));
        debug!(id = %id, columns = ?columns, "Updating user row");

        // Bind order must follow `patched_columns`
        let mut query = sqlx::query(&sql);
        if let Some(ref username) = patch.username {
            query = query.bind(username);
        }
        if let Some(ref email) = patch.email {
            query = query.bind(email);
        }
        if let Some(ref password) = patch.password {
            query = query.bind(password);
        }
        if let Some(latitude) = patch.latitude {
            query = query.bind(latitude);
        }
        if let Some(longitude) = patch.longitude {
            query = query.bind(longitude);
        }
        if let Some(ref language) = patch.browser_language {
            query = query.bind(language);
        }

        let mut conn = self.acquire().await?;
        let result = query
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(RunResult { rows_affected: result.rows_affected() })
    }

    pub async fn delete(&self, id: &str) -> Result<RunResult, StorageError> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(RunResult { rows_affected: result.rows_affected() })
    }

    pub async fn count_all(&self) -> Result<u64, StorageError> {
        let mut conn = self.acquire().await?;
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM users")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        let count: i64 = row.try_get("cnt")
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(count as u64)
    }
}

fn patched_columns(patch: &UserPatch) -> Vec<&'static str> {
    let mut columns = Vec::new();
    if patch.username.is_some() {
        columns.push("username");
    }
    if patch.email.is_some() {
        columns.push("email");
    }
    if patch.password.is_some() {
        columns.push("password");
    }
    if patch.latitude.is_some() {
        columns.push("latitude");
    }
    if patch.longitude.is_some() {
        columns.push("longitude");
    }
    if patch.browser_language.is_some() {
        columns.push("browser_language");
    }
    columns
}

/// Unique/primary-key violations become [`StorageError::UniqueViolation`].
fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        let message = db_err.message();
        if db_err.is_unique_violation()
            || message.contains("UNIQUE constraint failed")
            || message.contains("Duplicate entry")
        {
            return StorageError::UniqueViolation(message.to_string());
        }
    }
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(err.to_string())
        }
        other => StorageError::Backend(other.to_string()),
    }
}

fn text_column(row: &AnyRow, column: &str) -> Result<String, StorageError> {
    row.try_get::<String, _>(column).or_else(|_| {
        row.try_get::<Vec<u8>, _>(column)
            .map_err(|e| StorageError::Backend(e.to_string()))
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| StorageError::Backend(e.to_string()))
            })
    })
}

fn optional_text_column(row: &AnyRow, column: &str) -> Result<Option<String>, StorageError> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(value) => Ok(value),
        Err(_) => row
            .try_get::<Option<Vec<u8>>, _>(column)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .map(|bytes| String::from_utf8(bytes).map_err(|e| StorageError::Backend(e.to_string())))
            .transpose(),
    }
}

fn user_from_row(row: &AnyRow) -> Result<User, StorageError> {
    Ok(User {
        id: text_column(row, "id")?,
        username: text_column(row, "username")?,
        email: text_column(row, "email")?,
        password: text_column(row, "password")?,
        latitude: row.try_get("latitude").map_err(|e| StorageError::Backend(e.to_string()))?,
        longitude: row.try_get("longitude").map_err(|e| StorageError::Backend(e.to_string()))?,
        browser_language: optional_text_column(row, "browser_language")?,
    })
}
