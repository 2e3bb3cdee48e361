use boiboi_engine::{
    db_types::{AccountStatus, Kobo, NewCard, NewUser, OrderStatusType, PaymentMethod, ProgressStatus, TransactionType, UserRole},
    traits::ChargeStatus,
    AccountManagement,
    LedgerError,
    MarketplaceDatabase,
    MarketplaceError,
    OrderQueryFilter,
};
use support::{mock_gateway::MockGateway, orders::checkout_request, prepare_env::prepare_test_env};

mod support;

fn naira(v: i64) -> Kobo {
    Kobo::from_naira(v)
}

#[tokio::test]
async fn wallet_checkout_debits_the_wallet() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(3_500), naira(500));
    let order = env.checkout_api(MockGateway::new()).checkout(&market.customer.id, request).await.unwrap();

    assert_eq!(order.status, OrderStatusType::Ongoing);
    assert_eq!(order.progress_status, ProgressStatus::OrderReceivedByVendor);
    assert!(order.is_paid_for);
    assert!(order.rider_id.is_none());
    assert_eq!(order.price, naira(3_500));
    assert_eq!(order.code, "4821");

    let customer = env.user(&market.customer).await;
    assert_eq!(customer.wallet_balance, naira(16_500));
    assert!(customer.current_cart_id.is_none());
    let txs = env.db.fetch_wallet_transactions(&customer.id).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].tx_type, TransactionType::Debit);
    assert_eq!(txs[0].amount, naira(3_500));
}

#[tokio::test]
async fn wallet_floor_is_enforced() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let customer = env
        .db
        .insert_user(NewUser::new(UserRole::Customer, "Ngozi", "ngozi@example.com").with_balance(naira(5_000)))
        .await
        .unwrap();
    let cart = env.db.insert_cart(&customer.id).await.unwrap();
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(4_950), naira(500));
    let err = env.checkout_api(MockGateway::new()).checkout(&customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InsufficientBalance { .. }), "{err}");

    assert_eq!(env.user(&customer).await.wallet_balance, naira(5_000));
    let orders = env.db.search_orders(OrderQueryFilter::default().with_customer_id(customer.id.clone())).await.unwrap();
    assert!(orders.is_empty());
    assert!(env.db.fetch_wallet_transactions(&customer.id).await.unwrap().is_empty());

    // Leaving exactly the floor behind is fine
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(4_900), naira(500));
    env.checkout_api(MockGateway::new()).checkout(&customer.id, request).await.unwrap();
    assert_eq!(env.user(&customer).await.wallet_balance, naira(100));
}

#[tokio::test]
async fn customers_without_a_wallet_cannot_pay_from_it() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let customer = env
        .db
        .insert_user(NewUser::new(UserRole::Customer, "Sade", "sade@example.com").without_wallet())
        .await
        .unwrap();
    let cart = env.db.insert_cart(&customer.id).await.unwrap();
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(1_000), naira(200));
    let err = env.checkout_api(MockGateway::new()).checkout(&customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::WalletNotProvisioned));
}

#[tokio::test]
async fn inactive_and_unknown_stores_are_rejected() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let closed = env.db.insert_store("Closed Kitchen", AccountStatus::Disabled).await.unwrap();
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let api = env.checkout_api(MockGateway::new());

    let request = checkout_request(cart.id.as_str(), closed.id.as_str(), naira(1_000), naira(200));
    let err = api.checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::StoreInactive));

    let request = checkout_request(cart.id.as_str(), "65f0a1b2c3d4e5f6a7b8c9d0", naira(1_000), naira(200));
    let err = api.checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::StoreNotFound(_)));

    let request = checkout_request(cart.id.as_str(), "not-a-store", naira(1_000), naira(200));
    let err = api.checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));
    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(20_000));
}

#[tokio::test]
async fn approved_card_charge_places_the_order() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let card = env
        .db
        .insert_card(&market.customer.id, NewCard {
            authorization_code: "AUTH_8dfhjjdt".into(),
            bank: "Zenith Bank".into(),
            card_type: "visa".into(),
        })
        .await
        .unwrap();
    assert!(card.is_selected);
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let mut request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(7_000), naira(800));
    request.checkout_type = PaymentMethod::Card;
    request.card_id = Some(card.id.to_string());
    let gateway = MockGateway::new();
    let order = env.checkout_api(gateway.clone()).checkout(&market.customer.id, request).await.unwrap();

    assert_eq!(order.price, naira(7_000));
    let charges = gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, naira(7_000));
    assert_eq!(charges[0].authorization_code, "AUTH_8dfhjjdt");
    assert_eq!(charges[0].metadata["type"], "card");
    // Card payments leave the wallet alone
    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(20_000));
    assert!(env.db.fetch_wallet_transactions(&market.customer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn declined_card_charges_leave_no_trace() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let card = env
        .db
        .insert_card(&market.customer.id, NewCard {
            authorization_code: "AUTH_x1".into(),
            bank: "GTBank".into(),
            card_type: "mastercard".into(),
        })
        .await
        .unwrap();
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let mut request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(2_000), naira(300));
    request.checkout_type = PaymentMethod::Card;
    request.card_id = Some(card.id.to_string());

    let gateway = MockGateway::new();
    gateway.set_charge_outcome(ChargeStatus::Failed, "Declined");
    let err = env.checkout_api(gateway.clone()).checkout(&market.customer.id, request.clone()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::PaymentDeclined { status: ChargeStatus::Failed, .. }));

    // A success status without the approval text is not good enough either
    gateway.set_charge_outcome(ChargeStatus::Success, "Pending authorization");
    let err = env.checkout_api(gateway).checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::PaymentDeclined { .. }));

    let orders = env.db.search_orders(OrderQueryFilter::default()).await.unwrap();
    assert!(orders.is_empty());
    let customer = env.user(&market.customer).await;
    assert_eq!(customer.current_cart_id, Some(cart.id));
}

#[tokio::test]
async fn unknown_cards_are_rejected() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let mut request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(2_000), naira(300));
    request.checkout_type = PaymentMethod::Card;
    request.card_id = Some("65f0a1b2c3d4e5f6a7b8c9d0".into());
    let gateway = MockGateway::new();
    let err = env.checkout_api(gateway.clone()).checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::CardNotFound));
    assert!(gateway.charges().is_empty());
}

#[tokio::test]
async fn simultaneous_wallet_checkouts_cannot_overdraw() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let first_cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let second_cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let api = env.checkout_api(MockGateway::new());
    let store = market.store.id.as_str();

    // Each checkout passes the balance check on its own, but only one of them fits in ₦20,000
    let (a, b) = tokio::join!(
        api.checkout(&market.customer.id, checkout_request(first_cart.id.as_str(), store, naira(15_000), naira(500))),
        api.checkout(&market.customer.id, checkout_request(second_cart.id.as_str(), store, naira(15_000), naira(500))),
    );
    let (placed, refused): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
    assert_eq!(placed.len(), 1);
    assert_eq!(refused.len(), 1);
    let err = refused.into_iter().next().unwrap().unwrap_err();
    assert!(matches!(err, MarketplaceError::InsufficientBalance { .. }), "{err}");

    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(5_000));
    let debits = env
        .db
        .fetch_wallet_transactions(&market.customer.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
        .count();
    assert_eq!(debits, 1);
    let orders =
        env.db.search_orders(OrderQueryFilter::default().with_customer_id(market.customer.id.clone())).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn carts_must_exist() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let request = checkout_request("65f0a1b2c3d4e5f6a7b8cc00", market.store.id.as_str(), naira(1_000), naira(200));
    let err = env.checkout_api(MockGateway::new()).checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartNotFound(_))), "{err}");
    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(20_000));
    assert!(env.db.fetch_wallet_transactions(&market.customer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn customers_cannot_check_out_someone_elses_cart() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let other = env
        .db
        .insert_user(NewUser::new(UserRole::Customer, "Kemi", "kemi@example.com").with_balance(naira(5_000)))
        .await
        .unwrap();
    let cart = env.db.insert_cart(&other.id).await.unwrap();
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(1_000), naira(200));
    let err = env.checkout_api(MockGateway::new()).checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartNotOwned(_))), "{err}");

    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(20_000));
    // The owner can still use it
    let other = env.user(&other).await;
    assert_eq!(other.current_cart_id, Some(cart.id.clone()));
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(1_000), naira(200));
    env.checkout_api(MockGateway::new()).checkout(&other.id, request).await.unwrap();
}

#[tokio::test]
async fn a_cart_is_checked_out_only_once() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    let api = env.checkout_api(MockGateway::new());
    let request = checkout_request(cart.id.as_str(), market.store.id.as_str(), naira(2_000), naira(300));
    api.checkout(&market.customer.id, request.clone()).await.unwrap();
    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(18_000));

    let err = api.checkout(&market.customer.id, request).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartAlreadyCheckedOut(_))), "{err}");
    assert_eq!(env.user(&market.customer).await.wallet_balance, naira(18_000));
    let orders =
        env.db.search_orders(OrderQueryFilter::default().with_customer_id(market.customer.id.clone())).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn bad_carts_are_caught_before_charging_a_card() {
    let env = prepare_test_env().await;
    let market = env.seed_marketplace().await;
    let card = env
        .db
        .insert_card(&market.customer.id, NewCard {
            authorization_code: "AUTH_c4rt".into(),
            bank: "Access Bank".into(),
            card_type: "verve".into(),
        })
        .await
        .unwrap();
    let gateway = MockGateway::new();
    let api = env.checkout_api(gateway.clone());
    let card_request = |cart_id: &str| {
        let mut request = checkout_request(cart_id, market.store.id.as_str(), naira(2_000), naira(300));
        request.checkout_type = PaymentMethod::Card;
        request.card_id = Some(card.id.to_string());
        request
    };

    let err = api.checkout(&market.customer.id, card_request("65f0a1b2c3d4e5f6a7b8cc00")).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartNotFound(_))), "{err}");

    let other = env.db.insert_user(NewUser::new(UserRole::Customer, "Femi", "femi@example.com")).await.unwrap();
    let foreign = env.db.insert_cart(&other.id).await.unwrap();
    let err = api.checkout(&market.customer.id, card_request(foreign.id.as_str())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartNotOwned(_))), "{err}");

    let cart = env.db.insert_cart(&market.customer.id).await.unwrap();
    api.checkout(&market.customer.id, card_request(cart.id.as_str())).await.unwrap();
    assert_eq!(gateway.charges().len(), 1);
    let err = api.checkout(&market.customer.id, card_request(cart.id.as_str())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Ledger(LedgerError::CartAlreadyCheckedOut(_))), "{err}");
    // Only the one good checkout reached the gateway
    assert_eq!(gateway.charges().len(), 1);
}
