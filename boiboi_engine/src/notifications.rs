//! Push notification copy and delivery.
//!
//! The copy functions are pure, so they can be tested without a push provider. [`NotificationDispatcher`] resolves a
//! user's registered devices and sends through a [`PushSender`]. Delivery is best-effort: failures are logged and a
//! device token the provider no longer recognises is deregistered. Nothing is ever returned to the caller.
use log::*;

use crate::{
    db_types::{Order, ProgressStatus, UserId, UserRole},
    events::{OrderPlacedEvent, ProgressUpdatedEvent},
    traits::{Notification, PushError, PushSender},
    MarketplaceDatabase,
};

pub fn order_placed_for_customer() -> Notification {
    Notification::new("Successful Order Placement!", "Your order has been placed successfully and sent to the vendor")
}

pub fn new_order_for_riders() -> Notification {
    Notification::new("New Order Alert!", "New Order placed by a Customer. Click to view")
}

pub fn new_order_for_merchant(customer_first_name: &str) -> Notification {
    Notification::new(
        format!("{customer_first_name} has placed a new order on your store!"),
        "Your store has a new pending order",
    )
}

/// The customer-facing notification for an order that just moved to a new progress status, if that status has one.
pub fn progress_notification(order: &Order, rider_first_name: &str) -> Option<Notification> {
    match order.progress_status {
        ProgressStatus::OrderCreated | ProgressStatus::OrderReceivedByVendor => None,
        ProgressStatus::OrderAcceptedByRider => Some(Notification::new(
            "Your Order Has Been Accepted By Rider!",
            format!("{rider_first_name} is on the way to pick up your order. Sit tight, it's in good hands!"),
        )),
        ProgressStatus::RiderAtVendor => Some(Notification::new(
            "Rider at the Vendor!",
            format!("{rider_first_name} has arrived at the vendor and is picking up your order"),
        )),
        ProgressStatus::RiderOnHisWay => Some(Notification::new(
            "Your Order is on the Way!",
            "The rider is on the way to your location. Get ready to receive your order!",
        )),
        ProgressStatus::RiderAtUserLocation => Some(Notification::new(
            "Rider at Your Location!",
            format!("The rider has arrived at your location. Please collect your order with the code {}", order.code),
        )),
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher<B, P> {
    db: B,
    push: P,
}

impl<B, P> NotificationDispatcher<B, P>
where
    B: MarketplaceDatabase,
    P: PushSender,
{
    pub fn new(db: B, push: P) -> Self {
        Self { db, push }
    }

    /// Sends the notification to every device the user has registered. Returns the number of successful deliveries.
    pub async fn notify_user(&self, user_id: &UserId, notification: &Notification) -> usize {
        let tokens = match self.db.fetch_device_tokens(user_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("📬️ Could not fetch device tokens for {user_id}: {e}");
                return 0;
            },
        };
        let mut delivered = 0;
        for token in tokens {
            match self.push.send(&token.token, notification).await {
                Ok(()) => delivered += 1,
                Err(PushError::StaleToken(reason)) => {
                    info!("📬️ Removing stale device token #{} of {user_id}: {reason}", token.id);
                    if let Err(e) = self.db.delete_device_token(&token.token).await {
                        warn!("📬️ Could not remove device token #{}: {e}", token.id);
                    }
                },
                Err(e) => warn!("📬️ Could not notify {user_id}: {e}"),
            }
        }
        delivered
    }

    /// Tells the customer that the order went through, every rider that there is a new order, and the store admin who
    /// ordered.
    pub async fn on_order_placed(&self, event: OrderPlacedEvent) {
        let order = event.order;
        self.notify_user(&order.customer_id, &order_placed_for_customer()).await;

        match self.db.fetch_users_by_role(UserRole::Rider).await {
            Ok(riders) => {
                let alert = new_order_for_riders();
                for rider in riders {
                    self.notify_user(&rider.id, &alert).await;
                }
            },
            Err(e) => warn!("📬️ Could not fetch riders to announce order {}: {e}", order.id),
        }

        let admin = match self.db.fetch_store_admin(&order.store_id).await {
            Ok(Some(admin)) => admin,
            Ok(None) => {
                warn!("📬️ Store {} has no admin to notify about order {}", order.store_id, order.id);
                return;
            },
            Err(e) => {
                warn!("📬️ Could not fetch the admin of store {}: {e}", order.store_id);
                return;
            },
        };
        match self.db.fetch_user(&order.customer_id).await {
            Ok(Some(customer)) => {
                self.notify_user(&admin.id, &new_order_for_merchant(&customer.first_name)).await;
            },
            Ok(None) => warn!("📬️ Customer {} of order {} does not exist", order.customer_id, order.id),
            Err(e) => warn!("📬️ Could not fetch customer {}: {e}", order.customer_id),
        }
    }

    pub async fn on_progress_updated(&self, event: ProgressUpdatedEvent) {
        let order = event.order;
        let rider_name = match &order.rider_id {
            Some(rider_id) => match self.db.fetch_user(rider_id).await {
                Ok(Some(rider)) => rider.first_name,
                Ok(None) => String::from("Your rider"),
                Err(e) => {
                    warn!("📬️ Could not fetch rider {rider_id}: {e}");
                    String::from("Your rider")
                },
            },
            None => String::from("Your rider"),
        };
        if let Some(notification) = progress_notification(&order, &rider_name) {
            self.notify_user(&order.customer_id, &notification).await;
        }
    }
}
