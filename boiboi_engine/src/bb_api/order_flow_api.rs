use std::{fmt::Debug, str::FromStr};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::{LedgerError, OrderQueryFilter},
    db_types::{Order, OrderId, OrderStatusType, ProgressStatus, UserId, UserRole},
    events::{EventProducers, ProgressUpdatedEvent},
    MarketplaceDatabase,
};

/// How strictly progress updates are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Any progress status may follow any other, so mistakes can be corrected.
    #[default]
    Lenient,
    /// Progress only moves forward through the delivery sequence.
    Strict,
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            s => Err(format!("Invalid progress mode: {s}")),
        }
    }
}

impl ProgressMode {
    pub fn allows(&self, from: ProgressStatus, to: ProgressStatus) -> bool {
        match self {
            Self::Lenient => true,
            Self::Strict => to > from,
        }
    }
}

/// `OrderFlowApi` moves ongoing orders through the delivery sequence and answers order queries.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    mode: ProgressMode,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.mode)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, mode: ProgressMode::default() }
    }

    pub fn with_mode(mut self, mode: ProgressMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ProgressMode {
        self.mode
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        Ok(self.db.search_orders(query).await?)
    }

    /// Moves an ongoing order to `status` on behalf of `acting_user`.
    ///
    /// Accepting an order (`orderAcceptedByRider`) assigns the acting user as the order's rider. Only riders may do
    /// this. Once a rider holds the order, acceptance by any other rider is refused with `NotOrderParticipant`. The
    /// assigned rider may accept again when the progress mode allows it.
    ///
    /// Terminal orders are never updated. Subscribers to the progress hook are notified once the update is stored.
    pub async fn update_progress(
        &self,
        order_id: &OrderId,
        status: ProgressStatus,
        acting_user: &UserId,
    ) -> Result<Order, MarketplaceError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::Completed => return Err(LedgerError::OrderAlreadyCompleted.into()),
            OrderStatusType::Cancelled => return Err(LedgerError::OrderAlreadyCancelled.into()),
            OrderStatusType::Ongoing => {},
        }
        let previous = order.progress_status;
        if !self.mode.allows(previous, status) {
            debug!("🔄️ Rejected progress update for order {order_id}: {previous} -> {status}");
            return Err(MarketplaceError::InvalidTransition { from: previous, to: status });
        }
        let rider = if status == ProgressStatus::OrderAcceptedByRider {
            let user =
                self.db.fetch_user(acting_user).await?.ok_or_else(|| LedgerError::UserNotFound(acting_user.clone()))?;
            if user.role != UserRole::Rider {
                return Err(MarketplaceError::validation("Only riders can accept orders"));
            }
            if order.rider_id.as_ref().is_some_and(|r| r != acting_user) {
                debug!("🔄️ Rider {acting_user} tried to accept order {order_id}, which already has a rider");
                return Err(LedgerError::NotOrderParticipant(acting_user.clone()).into());
            }
            Some(acting_user)
        } else {
            None
        };
        let updated = self.db.update_order_progress(order_id, status, rider).await?;
        debug!("🔄️ Order {order_id} progress moved from {previous} to {status} by {acting_user}");
        self.producers.progress_updated(ProgressUpdatedEvent::new(previous, updated.clone())).await;
        Ok(updated)
    }
}
