use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::traits::{LedgerError, WithdrawalFilter},
    db_types::{NewWithdrawalRequest, WithdrawalId, WithdrawalRequest, WithdrawalRetry, WithdrawalStatus},
};

pub async fn insert_withdrawal_request(
    request: NewWithdrawalRequest,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, LedgerError> {
    let request = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        INSERT INTO withdrawal_requests (
            id, user_id, amount, request_type, status, attempts, next_attempt_at, last_error, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, 'pending', 0, NULL, NULL, $5, $5)
        RETURNING *
        "#,
    )
    .bind(WithdrawalId::random())
    .bind(request.user_id)
    .bind(request.amount)
    .bind(request.request_type)
    .bind(request.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🏧️ Withdrawal request {} for {} queued", request.id, request.amount);
    Ok(request)
}

pub async fn fetch_withdrawal_request(
    id: &WithdrawalId,
    conn: &mut SqliteConnection,
) -> Result<Option<WithdrawalRequest>, LedgerError> {
    let request = sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawal_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

pub async fn fetch_withdrawal_requests(
    filter: WithdrawalFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawalRequest>, LedgerError> {
    let mut builder = QueryBuilder::new("SELECT * FROM withdrawal_requests ");
    if filter.user_id.is_some() || filter.status.is_some() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    builder.push(" ORDER BY created_at DESC");
    let requests = builder.build_query_as::<WithdrawalRequest>().fetch_all(conn).await?;
    Ok(requests)
}

/// Pending requests created at or before `created_before` that are not waiting out a retry delay, oldest first.
pub async fn fetch_due_withdrawals(
    created_before: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawalRequest>, LedgerError> {
    let requests = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        SELECT * FROM withdrawal_requests
        WHERE status = 'pending'
          AND created_at <= $1
          AND (next_attempt_at IS NULL OR next_attempt_at <= $2)
        ORDER BY created_at
        "#,
    )
    .bind(created_before)
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(requests)
}

/// Marks a pending request as processed. Fails if the request is no longer pending, so a payout can only be
/// recorded once.
pub async fn mark_processed(id: &WithdrawalId, conn: &mut SqliteConnection) -> Result<WithdrawalRequest, LedgerError> {
    set_status_from(id, WithdrawalStatus::Pending, WithdrawalStatus::Processed, conn).await
}

pub async fn record_failure(
    id: &WithdrawalId,
    error: &str,
    retry: WithdrawalRetry,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, LedgerError> {
    let (status, next_attempt_at) = match retry {
        WithdrawalRetry::RetryAt(at) => (WithdrawalStatus::Pending, Some(at)),
        WithdrawalRetry::DeadLetter => (WithdrawalStatus::DeadLetter, None),
    };
    let request = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests SET
            attempts = attempts + 1,
            status = $1,
            next_attempt_at = $2,
            last_error = $3,
            updated_at = $4
        WHERE id = $5 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(next_attempt_at)
    .bind(error)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match request {
        Some(r) => {
            if r.status == WithdrawalStatus::DeadLetter {
                warn!("🏧️ Withdrawal request {id} moved to the dead-letter queue after {} attempts", r.attempts);
            }
            Ok(r)
        },
        None => Err(missing_or_conflict(id, conn).await?),
    }
}

/// Moves a dead-lettered request back to pending with its attempt counter reset.
pub async fn requeue(id: &WithdrawalId, conn: &mut SqliteConnection) -> Result<WithdrawalRequest, LedgerError> {
    let request = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests SET
            status = 'pending', attempts = 0, next_attempt_at = NULL, updated_at = $1
        WHERE id = $2 AND status = 'deadLetter'
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match request {
        Some(r) => Ok(r),
        None => Err(missing_or_conflict(id, conn).await?),
    }
}

async fn set_status_from(
    id: &WithdrawalId,
    from: WithdrawalStatus,
    to: WithdrawalStatus,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, LedgerError> {
    let request = sqlx::query_as::<_, WithdrawalRequest>(
        "UPDATE withdrawal_requests SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *",
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id)
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    match request {
        Some(r) => Ok(r),
        None => Err(missing_or_conflict(id, conn).await?),
    }
}

async fn missing_or_conflict(id: &WithdrawalId, conn: &mut SqliteConnection) -> Result<LedgerError, LedgerError> {
    let err = match fetch_withdrawal_request(id, conn).await? {
        None => LedgerError::WithdrawalNotFound(id.clone()),
        Some(_) => LedgerError::WithdrawalStateConflict(id.clone()),
    };
    Ok(err)
}
