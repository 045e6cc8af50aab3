use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::shared::utils::parse_timestamp;
use chrono::{DateTime, Utc};
use log::LevelFilter;
use sqlx::{
    any::{AnyConnectOptions, AnyPoolOptions, AnyRow},
    AnyPool, ConnectOptions, Row, TypeInfo, ValueRef,
};
use std::str::FromStr;

mod assignments;
mod attendants;
mod companies;
pub mod distributed_lock;

pub use distributed_lock::DatabaseDistributedLock;

pub struct Database {
    pub(crate) pool: AnyPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        // Ensure drivers are installed for AnyPool
        sqlx::any::install_default_drivers();

        let mut connect_options = AnyConnectOptions::from_str(database_url)?;

        connect_options = connect_options
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, std::time::Duration::from_secs(1));

        let pool = AnyPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .connect_with(connect_options)
            .await?;

        if database_url.starts_with("sqlite") {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous = NORMAL")
                .execute(&pool)
                .await?;
        }

        tracing::info!("Database pool ready");

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

// Row decoding helpers shared by the repository impls

fn required_time(row: &AnyRow, column: &str) -> ApiResult<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw)
        .ok_or_else(|| ApiError::Internal(format!("Malformed timestamp in {}: {}", column, raw)))
}

/// Nullable text column. The Any driver never reports `is_null()` on its values
/// and refuses to decode a NULL into `Option<String>`, so NULL is detected from
/// the value's type instead.
fn optional_string(row: &AnyRow, column: &str) -> ApiResult<Option<String>> {
    if row.try_get_raw(column)?.type_info().name() == "NULL" {
        return Ok(None);
    }
    Ok(Some(row.try_get(column)?))
}

fn optional_time(row: &AnyRow, column: &str) -> ApiResult<Option<DateTime<Utc>>> {
    let raw = optional_string(row, column)?;
    match raw {
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            ApiError::Internal(format!("Malformed timestamp in {}: {}", column, raw))
        }),
        None => Ok(None),
    }
}

fn parsed<T>(row: &AnyRow, column: &str) -> ApiResult<T>
where
    T: FromStr<Err = crate::domain::errors::DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| ApiError::Internal(format!("Corrupt {} column: {}", column, e)))
}
