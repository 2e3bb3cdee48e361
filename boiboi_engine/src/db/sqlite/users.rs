use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::traits::LedgerError,
    db_types::{
        Card,
        CardId,
        DeviceToken,
        Kobo,
        NewCard,
        NewUser,
        NewWithdrawalBank,
        StoreId,
        User,
        UserId,
        UserRole,
        WithdrawalBank,
    },
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, LedgerError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (
            id, role, status, is_admin, first_name, email, store_id, delivery_service_id, current_cart_id,
            has_wallet, wallet_balance, p2p_balance, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $12)
        "#,
    )
    .bind(&user.id)
    .bind(user.role)
    .bind(user.status)
    .bind(user.is_admin)
    .bind(&user.first_name)
    .bind(&user.email)
    .bind(&user.store_id)
    .bind(&user.delivery_service_id)
    .bind(&user.current_cart_id)
    .bind(user.has_wallet)
    .bind(user.wallet_balance)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    debug!("🧑️ Provisioned {} account {}", user.role, user.id);
    fetch_user(&user.id, conn).await?.ok_or(LedgerError::UserNotFound(user.id))
}

pub async fn fetch_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 COLLATE NOCASE")
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_users_by_role(role: UserRole, conn: &mut SqliteConnection) -> Result<Vec<User>, LedgerError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = $1 AND status = 'active' ORDER BY created_at")
        .bind(role)
        .fetch_all(conn)
        .await?;
    Ok(users)
}

pub async fn fetch_store_admin(store_id: &StoreId, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE store_id = $1 AND role = 'merchant' ORDER BY is_admin DESC, created_at LIMIT 1",
    )
    .bind(store_id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Adds `delta` to the user's wallet balance in place. Negative values debit the wallet.
pub async fn adjust_wallet_balance(
    user_id: &UserId,
    delta: Kobo,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query(
        "UPDATE users SET wallet_balance = wallet_balance + $1, updated_at = $2 WHERE id = $3",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound(user_id.clone()));
    }
    trace!("🧑️ Wallet of {user_id} adjusted by {delta}");
    Ok(())
}

/// Debits `amount` from the user's wallet, but only if at least `floor` remains afterwards.
pub async fn debit_wallet_above_floor(
    user_id: &UserId,
    amount: Kobo,
    floor: Kobo,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query(
        "UPDATE users SET wallet_balance = wallet_balance - $1, updated_at = $2 WHERE id = $3 AND wallet_balance - $1 >= \
         $4",
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(user_id)
    .bind(floor)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        trace!("🧑️ Wallet of {user_id} debited by {amount}");
        return Ok(());
    }
    match fetch_user(user_id, conn).await? {
        Some(user) => Err(LedgerError::InsufficientBalance {
            balance: user.wallet_balance,
            required: amount.saturating_add(floor),
        }),
        None => Err(LedgerError::UserNotFound(user_id.clone())),
    }
}

pub async fn adjust_p2p_balance(user_id: &UserId, delta: Kobo, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE users SET p2p_balance = p2p_balance + $1, updated_at = $2 WHERE id = $3")
        .bind(delta)
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::RiderNotFound(user_id.clone()));
    }
    trace!("🧑️ P2P balance of {user_id} adjusted by {delta}");
    Ok(())
}

pub async fn clear_current_cart(user_id: &UserId, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("UPDATE users SET current_cart_id = NULL, updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

//--------------------------------------        Cards        ---------------------------------------------------------
pub async fn fetch_cards(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Card>, LedgerError> {
    let cards = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE user_id = $1 ORDER BY created_at")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(cards)
}

pub async fn insert_card(user_id: &UserId, card: NewCard, conn: &mut SqliteConnection) -> Result<Card, LedgerError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    let card = sqlx::query_as::<_, Card>(
        r#"
        INSERT INTO cards (id, user_id, authorization_code, bank, card_type, is_selected, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(CardId::random())
    .bind(user_id)
    .bind(card.authorization_code)
    .bind(card.bank)
    .bind(card.card_type)
    .bind(count == 0)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(card)
}

//--------------------------------------   Withdrawal banks  ---------------------------------------------------------
pub async fn fetch_active_bank(
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<WithdrawalBank>, LedgerError> {
    let bank = sqlx::query_as::<_, WithdrawalBank>(
        "SELECT * FROM withdrawal_banks WHERE user_id = $1 AND is_active = TRUE ORDER BY id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(bank)
}

/// Inserts a new bank for the user and deactivates any previous one. Not atomic on its own; call it inside a
/// transaction.
pub async fn insert_withdrawal_bank(
    user_id: &UserId,
    bank: NewWithdrawalBank,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalBank, LedgerError> {
    sqlx::query("UPDATE withdrawal_banks SET is_active = FALSE WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let bank = sqlx::query_as::<_, WithdrawalBank>(
        r#"
        INSERT INTO withdrawal_banks (user_id, name, bank_name, account_number, recipient_code, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(bank.name)
    .bind(bank.bank_name)
    .bind(bank.account_number)
    .bind(bank.recipient_code)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(bank)
}

//--------------------------------------    Device tokens    ---------------------------------------------------------
pub async fn fetch_device_tokens(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<DeviceToken>, LedgerError> {
    let tokens = sqlx::query_as::<_, DeviceToken>("SELECT * FROM device_tokens WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(tokens)
}

/// Registers a device token. A token that was registered to another user moves to this one.
pub async fn upsert_device_token(
    user_id: &UserId,
    token: &str,
    device_type: &str,
    conn: &mut SqliteConnection,
) -> Result<DeviceToken, LedgerError> {
    let token = sqlx::query_as::<_, DeviceToken>(
        r#"
        INSERT INTO device_tokens (user_id, token, device_type, created_at) VALUES ($1, $2, $3, $4)
        ON CONFLICT (token) DO UPDATE SET user_id = excluded.user_id, device_type = excluded.device_type
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(device_type)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(token)
}

pub async fn delete_device_token(token: &str, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("DELETE FROM device_tokens WHERE token = $1").bind(token).execute(conn).await?;
    trace!("🧑️ Removed {} device token(s)", result.rows_affected());
    Ok(())
}
