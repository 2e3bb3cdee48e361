use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::{LedgerError, RatingSubject},
    db_types::{Order, OrderId, UserId, UserRole},
    MarketplaceDatabase,
};

/// How many of the most recently completed orders feed into a rating.
pub const RATING_WINDOW: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub riders: usize,
    pub stores: usize,
}

/// The mean of the ratings that were given. No ratings at all averages to zero.
pub fn average_rating(ratings: &[Option<i64>]) -> f64 {
    let given = ratings.iter().flatten().copied().collect::<Vec<i64>>();
    if given.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let avg = given.iter().sum::<i64>() as f64 / given.len() as f64;
    avg
}

/// `RatingApi` records customer ratings and periodically rolls them up into rider and store ratings.
pub struct RatingApi<B> {
    db: B,
}

impl<B> Debug for RatingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RatingApi")
    }
}

impl<B> RatingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> RatingApi<B>
where B: MarketplaceDatabase
{
    /// Stores the customer's ratings (1 to 5) for a completed order. At least one of the two must be given.
    pub async fn rate_order(
        &self,
        order_id: &OrderId,
        customer: &UserId,
        rider_rating: Option<i64>,
        vendor_rating: Option<i64>,
    ) -> Result<Order, MarketplaceError> {
        if rider_rating.is_none() && vendor_rating.is_none() {
            return Err(MarketplaceError::validation("Provide a rider rating, a vendor rating, or both"));
        }
        if [rider_rating, vendor_rating].iter().flatten().any(|r| !(1..=5).contains(r)) {
            return Err(MarketplaceError::validation("Ratings must be between 1 and 5"));
        }
        let order = self.db.rate_order(order_id, customer, rider_rating, vendor_rating).await?;
        debug!("⭐️ Order {order_id} rated by {customer}. Rider: {rider_rating:?}, vendor: {vendor_rating:?}");
        Ok(order)
    }

    /// Recomputes the rating of every rider and every active store from their last [`RATING_WINDOW`] completed
    /// orders. A failure for one rider or store is logged and does not stop the others.
    pub async fn recompute_all(&self, now: DateTime<Utc>) -> Result<RatingSummary, MarketplaceError> {
        let mut summary = RatingSummary::default();
        let riders = self.db.fetch_users_by_role(UserRole::Rider).await?;
        for rider in riders {
            match self.recompute_rider(&rider.id, now).await {
                Ok(_) => summary.riders += 1,
                Err(e) => warn!("⭐️ Could not update the rating of rider {}: {e}", rider.id),
            }
        }
        let stores = self.db.fetch_active_stores().await?;
        for store in stores {
            let subject = RatingSubject::Store(store.id.clone());
            let result = match self.db.fetch_recent_ratings(&subject, RATING_WINDOW).await {
                Ok(ratings) => self.db.update_store_rating(&store.id, average_rating(&ratings)).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => summary.stores += 1,
                Err(e) => warn!("⭐️ Could not update the rating of store {}: {e}", store.id),
            }
        }
        info!("⭐️ Ratings recomputed for {} rider(s) and {} store(s)", summary.riders, summary.stores);
        Ok(summary)
    }

    async fn recompute_rider(&self, rider: &UserId, now: DateTime<Utc>) -> Result<f64, LedgerError> {
        let ratings = self.db.fetch_recent_ratings(&RatingSubject::Rider(rider.clone()), RATING_WINDOW).await?;
        let value = average_rating(&ratings);
        self.db.upsert_rider_rating(rider, value, now).await?;
        trace!("⭐️ Rider {rider} rated {value:.2} from {} order(s)", ratings.len());
        Ok(value)
    }
}
