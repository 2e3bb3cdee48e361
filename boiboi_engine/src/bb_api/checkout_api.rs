use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    bb_api::{
        errors::MarketplaceError,
        order_objects::{CheckoutRequest, ValidCheckout},
    },
    db::traits::LedgerError,
    db_types::{new_payment_reference, AccountStatus, CartId, Order, PaymentMethod, User, UserId, MINIMUM_WALLET_BALANCE},
    events::{EventProducers, OrderPlacedEvent},
    traits::PaymentGateway,
    MarketplaceDatabase,
};

/// The gateway response text that accompanies an approved card charge.
const APPROVED: &str = "Approved";

/// `CheckoutApi` turns a paid cart into an order, paying either from the customer's wallet or with a saved card.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Places an order for `customer_id`.
    ///
    /// Validation and precondition failures, as well as declined or failed card charges, leave no trace: the order,
    /// its order transaction, the cart update and (for wallet payments) the wallet debit are only written once
    /// payment is secured, and then all in one transaction.
    ///
    /// The cart must be one of the customer's own carts that has not been checked out yet. The wallet floor is
    /// checked here for a quick answer and enforced again by the storage transaction that debits the wallet.
    pub async fn checkout(&self, customer_id: &UserId, request: CheckoutRequest) -> Result<Order, MarketplaceError> {
        let checkout = request.validate().map_err(MarketplaceError::Validation)?;
        let store = self
            .db
            .fetch_store(&checkout.store_id)
            .await?
            .ok_or_else(|| MarketplaceError::StoreNotFound(checkout.store_id.clone()))?;
        if store.status != AccountStatus::Active {
            debug!("🛒️ Checkout rejected. Store {} is {}", store.id, store.status);
            return Err(MarketplaceError::StoreInactive);
        }
        let customer = self
            .db
            .fetch_user(customer_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(customer_id.clone()))?;
        let order = match checkout.request.checkout_type {
            PaymentMethod::Wallet => self.checkout_from_wallet(&customer, checkout).await?,
            PaymentMethod::Card => self.checkout_from_card(&customer, checkout).await?,
        };
        info!("🛒️ Order {} placed by {} for {} ({})", order.id, customer.id, order.price, store.name);
        self.producers.order_placed(OrderPlacedEvent::new(order.clone())).await;
        Ok(order)
    }

    async fn checkout_from_wallet(&self, customer: &User, checkout: ValidCheckout) -> Result<Order, MarketplaceError> {
        if !customer.has_wallet {
            return Err(MarketplaceError::WalletNotProvisioned);
        }
        let price = checkout.request.total_price;
        if customer.wallet_balance.saturating_sub(price) < MINIMUM_WALLET_BALANCE {
            debug!("🛒️ {} cannot pay {price} from a wallet balance of {}", customer.id, customer.wallet_balance);
            return Err(MarketplaceError::InsufficientBalance {
                balance: customer.wallet_balance,
                required: price.saturating_add(MINIMUM_WALLET_BALANCE),
            });
        }
        let order = checkout.into_new_order(customer.id.clone(), new_payment_reference());
        match self.db.insert_order(order).await {
            Ok(order) => Ok(order),
            Err(LedgerError::InsufficientBalance { balance, required }) => {
                debug!("🛒️ {} cannot pay {price}. The wallet balance changed to {balance} during checkout", customer.id);
                Err(MarketplaceError::InsufficientBalance { balance, required })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Fails unless `cart_id` is one of the customer's carts that has not been checked out.
    async fn check_cart(&self, customer: &User, cart_id: &CartId) -> Result<(), MarketplaceError> {
        let cart = self.db.fetch_cart(cart_id).await?.ok_or_else(|| LedgerError::CartNotFound(cart_id.clone()))?;
        if cart.user_id != customer.id {
            return Err(LedgerError::CartNotOwned(cart_id.clone()).into());
        }
        if cart.is_completed {
            return Err(LedgerError::CartAlreadyCheckedOut(cart_id.clone()).into());
        }
        Ok(())
    }

    async fn checkout_from_card(&self, customer: &User, checkout: ValidCheckout) -> Result<Order, MarketplaceError> {
        let card_id = checkout.card_id.clone().ok_or(MarketplaceError::CardNotFound)?;
        let cards = self.db.fetch_cards(&customer.id).await?;
        let card = cards.into_iter().find(|c| c.id == card_id).ok_or(MarketplaceError::CardNotFound)?;
        self.check_cart(customer, &checkout.cart_id).await?;
        let price = checkout.request.total_price;
        let metadata = json!({ "type": "card", "cartId": checkout.cart_id, "storeId": checkout.store_id });
        trace!("🛒️ Charging card {} of {} for {price}", card.id, customer.id);
        let charge = self.gateway.charge_saved_card(&customer.email, &card.authorization_code, price, metadata).await?;
        if !charge.is_success() || charge.gateway_response != APPROVED {
            info!(
                "🛒️ Card charge for {} was not approved: {:?} / {}",
                customer.id, charge.status, charge.gateway_response
            );
            return Err(MarketplaceError::PaymentDeclined {
                status: charge.status,
                gateway_response: charge.gateway_response,
            });
        }
        let reference = charge.reference.clone();
        let order = checkout.into_new_order(customer.id.clone(), charge.reference);
        self.db.insert_order(order).await.map_err(|e| {
            error!(
                "🛒️ Card charge {reference} of {price} for {} succeeded, but the order could not be saved. The customer \
                 needs a refund. {e}",
                customer.id
            );
            MarketplaceError::from(e)
        })
    }
}
