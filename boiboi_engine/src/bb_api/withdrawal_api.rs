use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::{LedgerError, WithdrawalFilter},
    db_types::{
        Kobo,
        NewWithdrawalRequest,
        User,
        UserId,
        UserRole,
        WithdrawalId,
        WithdrawalRequest,
        WithdrawalRetry,
        MINIMUM_WALLET_BALANCE,
    },
    events::{EventProducers, WithdrawalProcessedEvent},
    traits::PaymentGateway,
    MarketplaceDatabase,
};

/// Transfer statuses that mean the payout did not happen.
const FAILED_TRANSFER_STATUSES: [&str; 3] = ["failed", "reversed", "abandoned"];

/// When failed payouts are retried.
///
/// The n-th failure schedules the next attempt `base × 2^(n−1)` later, capped at `max_delay`. After `max_attempts`
/// failures the request is dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { base_delay: Duration::hours(1), max_delay: Duration::hours(24), max_attempts: 8 }
    }
}

impl RetryPolicy {
    /// What to do after the `attempts`-th failed attempt (counting from 1).
    pub fn after_failure(&self, attempts: i64, now: DateTime<Utc>) -> WithdrawalRetry {
        if attempts >= self.max_attempts {
            return WithdrawalRetry::DeadLetter;
        }
        let exponent = u32::try_from((attempts - 1).clamp(0, 30)).unwrap_or(30);
        let delay = self
            .base_delay
            .checked_mul(2_i32.saturating_pow(exponent))
            .map_or(self.max_delay, |d| d.min(self.max_delay));
        WithdrawalRetry::RetryAt(now + delay)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRunSummary {
    pub processed: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// `WithdrawalApi` takes withdrawal requests and pays them out to the user's bank once they have aged.
pub struct WithdrawalApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    retry: RetryPolicy,
    min_age: Duration,
}

impl<B, G> Debug for WithdrawalApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({:?}, min age {})", self.retry, self.min_age)
    }
}

impl<B, G> WithdrawalApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers, retry: RetryPolicy::default(), min_age: Duration::hours(24) }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Requests are only paid out once they are at least this old.
    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> WithdrawalApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Queues a withdrawal of `amount` from the user's wallet.
    ///
    /// Merchants and riders who administer their delivery service may withdraw. The user needs an active withdrawal
    /// bank, and must keep more than ₦100 in the wallet. The wallet is only debited when the payout succeeds.
    pub async fn request_withdrawal(&self, user_id: &UserId, amount: Kobo) -> Result<WithdrawalRequest, MarketplaceError> {
        if amount <= Kobo::default() {
            return Err(MarketplaceError::validation("Withdrawal amount must be positive"));
        }
        let user = self.db.fetch_user(user_id).await?.ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?;
        self.check_withdrawal_rights(&user).await?;
        if self.db.fetch_active_bank(user_id).await?.is_none() {
            return Err(MarketplaceError::NoWithdrawalBank);
        }
        if user.wallet_balance.saturating_sub(amount) <= MINIMUM_WALLET_BALANCE {
            return Err(MarketplaceError::InsufficientBalance {
                balance: user.wallet_balance,
                required: amount.saturating_add(MINIMUM_WALLET_BALANCE + Kobo::from(1)),
            });
        }
        let request = self.db.insert_withdrawal_request(NewWithdrawalRequest::new(user.id, amount, user.role)).await?;
        info!("🏧️ Withdrawal {} of {amount} requested by {user_id}", request.id);
        Ok(request)
    }

    async fn check_withdrawal_rights(&self, user: &User) -> Result<(), MarketplaceError> {
        match user.role {
            UserRole::Merchant => Ok(()),
            UserRole::Rider => {
                let service_id = user
                    .delivery_service_id
                    .as_ref()
                    .ok_or_else(|| MarketplaceError::WithdrawalNotAllowed("You do not belong to a delivery service".into()))?;
                let service = self
                    .db
                    .fetch_delivery_service(service_id)
                    .await?
                    .ok_or_else(|| LedgerError::DeliveryServiceNotFound(user.id.clone()))?;
                if service.admin_user_id.as_ref() == Some(&user.id) {
                    Ok(())
                } else {
                    Err(MarketplaceError::WithdrawalNotAllowed("Only the admin of a delivery service can withdraw".into()))
                }
            },
            UserRole::Customer => Err(MarketplaceError::WithdrawalNotAllowed("Customers cannot withdraw".into())),
        }
    }

    pub async fn withdrawal_requests(&self, filter: WithdrawalFilter) -> Result<Vec<WithdrawalRequest>, MarketplaceError> {
        Ok(self.db.fetch_withdrawal_requests(filter).await?)
    }

    /// Pays out every pending request that is old enough and not waiting out a retry delay.
    ///
    /// Each request is handled on its own: a failed payout is recorded against that request and the run carries on.
    pub async fn process_due_withdrawals(&self, now: DateTime<Utc>) -> Result<WithdrawalRunSummary, MarketplaceError> {
        let due = self.db.fetch_due_withdrawals(now - self.min_age, now).await?;
        debug!("🏧️ {} withdrawal request(s) due", due.len());
        let mut summary = WithdrawalRunSummary::default();
        for request in due {
            let id = request.id.clone();
            match self.pay_out(request).await {
                Ok(()) => summary.processed += 1,
                Err(reason) => match self.record_failure(&id, &reason, now).await {
                    Ok(WithdrawalRetry::DeadLetter) => summary.dead_lettered += 1,
                    Ok(WithdrawalRetry::RetryAt(_)) => summary.retried += 1,
                    Err(e) => error!("🏧️ Could not record failed payout of {id}: {e}"),
                },
            }
        }
        info!(
            "🏧️ Withdrawal run complete. {} processed, {} to retry, {} dead-lettered",
            summary.processed, summary.retried, summary.dead_lettered
        );
        Ok(summary)
    }

    /// Attempts one payout. Any failure is returned as the reason to store against the request.
    async fn pay_out(&self, request: WithdrawalRequest) -> Result<(), String> {
        let user = match self.db.fetch_user(&request.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(format!("User {} not found", request.user_id)),
            Err(e) => return Err(e.to_string()),
        };
        if user.wallet_balance < request.amount {
            return Err(format!("Wallet balance {} is below the requested {}", user.wallet_balance, request.amount));
        }
        let bank = match self.db.fetch_active_bank(&user.id).await {
            Ok(Some(bank)) => bank,
            Ok(None) => return Err("No active withdrawal bank".to_string()),
            Err(e) => return Err(e.to_string()),
        };
        let receipt = self
            .gateway
            .initiate_transfer(&bank.recipient_code, request.amount, request.id.as_str())
            .await
            .map_err(|e| e.to_string())?;
        if FAILED_TRANSFER_STATUSES.contains(&receipt.status.as_str()) {
            return Err(format!("Transfer {} returned status {}", receipt.transfer_id, receipt.status));
        }
        let tx = self.db.complete_withdrawal(&request.id, &receipt.reference).await.map_err(|e| {
            error!(
                "🏧️ Transfer {} for withdrawal {} went through, but could not be recorded: {e}",
                receipt.transfer_id, request.id
            );
            e.to_string()
        })?;
        info!("🏧️ Withdrawal {} of {} paid to {} (transfer {})", request.id, request.amount, user.id, receipt.transfer_id);
        let request = self.db.fetch_withdrawal_request(&request.id).await.ok().flatten().unwrap_or(request);
        self.producers.withdrawal_processed(WithdrawalProcessedEvent::new(request, tx)).await;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: &WithdrawalId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRetry, LedgerError> {
        let attempts = self.db.fetch_withdrawal_request(id).await?.map(|r| r.attempts).unwrap_or_default() + 1;
        let retry = self.retry.after_failure(attempts, now);
        warn!("🏧️ Payout of withdrawal {id} failed (attempt {attempts}): {reason}. Next: {retry:?}");
        self.db.record_withdrawal_failure(id, reason, retry.clone()).await?;
        Ok(retry)
    }

    /// Gives a dead-lettered request a fresh set of attempts.
    pub async fn requeue(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, MarketplaceError> {
        let request = self.db.requeue_withdrawal(id).await?;
        info!("🏧️ Withdrawal {id} requeued");
        Ok(request)
    }
}
