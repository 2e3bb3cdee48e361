pub mod db;

pub mod orders;
pub mod stores;
pub mod users;
pub mod wallet;
pub mod withdrawals;

use std::{env, future::Future, str::FromStr, time::Duration};

use log::{debug, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::db::traits::LedgerError;

const SQLITE_DB_URL: &str = "sqlite://data/boiboi.db";
const MAX_TX_ATTEMPTS: u32 = 5;
const TX_RETRY_DELAY: Duration = Duration::from_millis(25);

pub fn db_url() -> String {
    let result = env::var("BB_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ BB_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), LedgerError> {
    sqlx::migrate!("./src/db/sqlite/migrations").run(pool).await?;
    info!("🗃️ Migrations complete");
    Ok(())
}

/// Runs a transaction until it commits or fails for a reason other than a lock conflict, making at most
/// `MAX_TX_ATTEMPTS` attempts. A transaction that hits a conflict has already been rolled back, so running it again
/// from the start is safe.
pub async fn retry_on_busy<T, F, Fut>(label: &str, mut transaction: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 1;
    loop {
        match transaction().await {
            Err(e) if e.is_transient() && attempt < MAX_TX_ATTEMPTS => {
                debug!("🗃️ {label} hit a lock conflict on attempt {attempt}. Retrying. {e}");
                tokio::time::sleep(TX_RETRY_DELAY * attempt).await;
                attempt += 1;
            },
            result => return result,
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn lock_conflicts_are_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_on_busy("Test", || async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(LedgerError::Busy("database is locked".into())),
                _ => Ok(42),
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_busy("Test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::OrderAlreadyCompleted)
        })
        .await;
        assert!(matches!(result, Err(LedgerError::OrderAlreadyCompleted)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_give_up_eventually() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_busy("Test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Busy("database is locked".into()))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Busy(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_TX_ATTEMPTS);
    }
}
