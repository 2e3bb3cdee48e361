use boiboi_engine::{
    db_types::{Kobo, Order, PaymentMethod, ProgressStatus, User},
    events::EventProducers,
    order_objects::CheckoutRequest,
    CheckoutApi,
    OrderFlowApi,
    SqliteDatabase,
};

use super::{mock_gateway::MockGateway, prepare_env::TestEnv};

pub const PICKUP_CODE: &str = "4821";

pub fn checkout_request(cart_id: &str, store: &str, price: Kobo, delivery_fee: Kobo) -> CheckoutRequest {
    CheckoutRequest {
        cart_id: cart_id.to_string(),
        store_id: store.to_string(),
        is_errand: false,
        checkout_type: PaymentMethod::Wallet,
        card_id: None,
        total_price: price,
        delivery_fee,
        service_charge: Kobo::default(),
        coupon_price: Kobo::default(),
        code: PICKUP_CODE.to_string(),
        delivery_location: Some("12 Allen Avenue, Ikeja".to_string()),
        delivery_instruction: None,
    }
}

impl TestEnv {
    pub fn checkout_api(&self, gateway: MockGateway) -> CheckoutApi<SqliteDatabase, MockGateway> {
        CheckoutApi::new(self.db.clone(), gateway, EventProducers::default())
    }

    pub fn order_flow_api(&self) -> OrderFlowApi<SqliteDatabase> {
        OrderFlowApi::new(self.db.clone(), EventProducers::default())
    }

    /// Opens a cart for the customer and pays for it from their wallet.
    pub async fn place_wallet_order(&self, customer: &User, store: &str, price: Kobo, delivery_fee: Kobo) -> Order {
        let cart = self.db.insert_cart(&customer.id).await.expect("cart");
        let request = checkout_request(cart.id.as_str(), store, price, delivery_fee);
        self.checkout_api(MockGateway::new()).checkout(&customer.id, request).await.expect("checkout")
    }

    pub async fn accept_order(&self, order: &Order, rider: &User) -> Order {
        self.order_flow_api()
            .update_progress(&order.id, ProgressStatus::OrderAcceptedByRider, &rider.id)
            .await
            .expect("accept order")
    }
}
