use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::Settlement,
    db_types::{CheckoutSettings, OrderId, PlatformAccount},
    events::{EventProducers, OrderCompletedEvent},
    fees::{FeePolicy, TieredFeePolicy},
    MarketplaceDatabase,
};

const BPS_100_PERCENT: i64 = 10_000;

/// `SettlementApi` completes orders and pays the store, the rider (or their delivery service) and the platform.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    policy: Arc<dyn FeePolicy>,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({} fee policy)", self.policy.name())
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: Arc::new(TieredFeePolicy) }
    }

    pub fn with_policy(mut self, policy: Arc<dyn FeePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &dyn FeePolicy {
        self.policy.as_ref()
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SettlementApi<B>
where B: MarketplaceDatabase
{
    /// Completes the order if `code` matches its pickup code.
    ///
    /// All payouts and the status change commit together. Completing an order a second time fails with
    /// `OrderAlreadyCompleted`, and nobody is paid twice.
    pub async fn complete_order(&self, order_id: &OrderId, code: &str) -> Result<Settlement, MarketplaceError> {
        if code.trim().is_empty() {
            return Err(MarketplaceError::validation("Order code is required"));
        }
        let settlement = self.db.complete_order(order_id, code, self.policy.as_ref()).await?;
        info!(
            "💰️ Order {order_id} completed. Store admin {} received {}, rider payout {:?} received {}, platform kept {}",
            settlement.store_admin,
            settlement.split.to_store,
            settlement.rider_payout,
            settlement.split.to_rider,
            settlement.split.to_platform
        );
        self.producers.order_completed(OrderCompletedEvent::new(settlement.clone())).await;
        Ok(settlement)
    }

    pub async fn checkout_settings(&self) -> Result<Option<CheckoutSettings>, MarketplaceError> {
        Ok(self.db.fetch_checkout_settings().await?)
    }

    /// Replaces the checkout settings. The store and platform shares must each lie in 0..=100% and together make up
    /// the whole subtotal.
    pub async fn update_checkout_settings(
        &self,
        settings: CheckoutSettings,
    ) -> Result<CheckoutSettings, MarketplaceError> {
        let range = 0..=BPS_100_PERCENT;
        if !range.contains(&settings.store_percent_bps) || !range.contains(&settings.platform_percent_bps) {
            return Err(MarketplaceError::validation("Percentages must be between 0 and 10000 basis points"));
        }
        if settings.store_percent_bps + settings.platform_percent_bps != BPS_100_PERCENT {
            return Err(MarketplaceError::validation("Store and platform percentages must add up to 100%"));
        }
        let settings = self.db.update_checkout_settings(settings).await?;
        info!("💰️ Checkout settings updated: {settings:?}");
        Ok(settings)
    }

    pub async fn platform_account(&self) -> Result<PlatformAccount, MarketplaceError> {
        Ok(self.db.fetch_platform_account().await?)
    }
}
