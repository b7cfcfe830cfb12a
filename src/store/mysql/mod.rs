use std::future::Future;
use std::time::Duration;

use actix_web::rt::time::timeout;
use sqlx::MySqlPool;

use super::{StoreError, StoreResult};

mod employee;
mod project;
mod salary;
mod user;

/// MySQL-backed store. Every call runs under `timeout`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn run<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(db_err.message().to_string());
            }
        }

        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Placeholder list `?, ?, ?` for an `IN (...)` clause.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_match_arity() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn pool_timeout_maps_to_store_timeout() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Timeout
        ));
    }

    #[test]
    fn row_not_found_is_a_backend_error() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}
