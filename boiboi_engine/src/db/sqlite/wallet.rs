use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::LedgerError,
    db_types::{
        new_object_id,
        CheckoutSettings,
        Kobo,
        PlatformAccount,
        RiderRating,
        TransactionType,
        UserId,
        WalletTransaction,
    },
};

/// Appends an entry to the user's wallet history. This does not change any balance.
pub async fn insert_wallet_transaction(
    user_id: &UserId,
    amount: Kobo,
    tx_type: TransactionType,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, LedgerError> {
    let tx = sqlx::query_as::<_, WalletTransaction>(
        r#"
        INSERT INTO wallet_transactions (id, payment_reference, user_id, amount, tx_type, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(new_object_id())
    .bind(reference)
    .bind(user_id)
    .bind(amount)
    .bind(tx_type)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("💰️ {tx_type} of {amount} recorded for {user_id} ({reference})");
    Ok(tx)
}

pub async fn reference_exists(reference: &str, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallet_transactions WHERE payment_reference = $1")
        .bind(reference)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn fetch_wallet_transactions(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, LedgerError> {
    let txs = sqlx::query_as::<_, WalletTransaction>(
        "SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}

//--------------------------------------   Platform account  ---------------------------------------------------------
pub async fn credit_platform(amount: Kobo, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO platform_account (id, balance, updated_at) VALUES (1, $1, $2)
        ON CONFLICT (id) DO UPDATE SET balance = balance + excluded.balance, updated_at = excluded.updated_at
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

/// The platform account. If nothing was ever credited, the balance is zero.
pub async fn fetch_platform_account(conn: &mut SqliteConnection) -> Result<PlatformAccount, LedgerError> {
    let account = sqlx::query_as::<_, PlatformAccount>("SELECT balance, updated_at FROM platform_account WHERE id = 1")
        .fetch_optional(conn)
        .await?;
    Ok(account.unwrap_or_else(|| PlatformAccount { balance: Kobo::default(), updated_at: Utc::now() }))
}

//--------------------------------------  Checkout settings  ---------------------------------------------------------
pub async fn fetch_checkout_settings(conn: &mut SqliteConnection) -> Result<Option<CheckoutSettings>, LedgerError> {
    let settings = sqlx::query_as::<_, CheckoutSettings>(
        "SELECT store_percent_bps, platform_percent_bps FROM checkout_settings WHERE id = 1",
    )
    .fetch_optional(conn)
    .await?;
    Ok(settings)
}

pub async fn upsert_checkout_settings(
    settings: CheckoutSettings,
    conn: &mut SqliteConnection,
) -> Result<CheckoutSettings, LedgerError> {
    let settings = sqlx::query_as::<_, CheckoutSettings>(
        r#"
        INSERT INTO checkout_settings (id, store_percent_bps, platform_percent_bps) VALUES (1, $1, $2)
        ON CONFLICT (id) DO UPDATE SET
            store_percent_bps = excluded.store_percent_bps,
            platform_percent_bps = excluded.platform_percent_bps
        RETURNING store_percent_bps, platform_percent_bps
        "#,
    )
    .bind(settings.store_percent_bps)
    .bind(settings.platform_percent_bps)
    .fetch_one(conn)
    .await?;
    Ok(settings)
}

//--------------------------------------    Rider ratings    ---------------------------------------------------------
pub async fn upsert_rider_rating(
    user_id: &UserId,
    value: f64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO rider_ratings (user_id, value, updated_at) VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(value)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_rider_rating(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Option<RiderRating>, LedgerError> {
    let rating = sqlx::query_as::<_, RiderRating>("SELECT * FROM rider_ratings WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(rating)
}
