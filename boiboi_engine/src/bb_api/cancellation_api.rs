use std::fmt::Debug;

use log::*;

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::Cancellation,
    db_types::{OrderId, UserId},
    events::{EventProducers, OrderCancelledEvent},
    MarketplaceDatabase,
};

/// `CancellationApi` cancels orders that no rider has picked up yet and refunds the customer's wallet.
pub struct CancellationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CancellationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CancellationApi")
    }
}

impl<B> CancellationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CancellationApi<B>
where B: MarketplaceDatabase
{
    /// Cancels the order and refunds its full price to the customer's wallet, whichever way it was paid.
    ///
    /// Only the customer and the admin of the order's store may cancel, and only while the order is ongoing and has
    /// no rider.
    pub async fn cancel_order(&self, order_id: &OrderId, acting_user: &UserId) -> Result<Cancellation, MarketplaceError> {
        let cancellation = self.db.cancel_order(order_id, acting_user).await?;
        info!(
            "🔄️ Order {order_id} cancelled by {acting_user}. {} refunded to {}",
            cancellation.refund.amount, cancellation.order.customer_id
        );
        let event = OrderCancelledEvent::new(cancellation.order.clone(), cancellation.refund.clone());
        self.producers.order_cancelled(event).await;
        Ok(cancellation)
    }
}
