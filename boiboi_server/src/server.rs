use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use boiboi_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    notifications::NotificationDispatcher,
    traits::PaymentGateway,
    CancellationApi,
    CheckoutApi,
    MarketplaceDatabase,
    OrderFlowApi,
    RatingApi,
    SettlementApi,
    SqliteDatabase,
    WalletApi,
    WithdrawalApi,
};
use futures::FutureExt;
use log::*;
use paystack_tools::PaystackApi;

use crate::{
    auth::{TokenIssuer, TokenValidator},
    config::{AuthConfig, PaystackSettings, ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{paystack::PaystackGateway, push::PushService},
    middleware::{
        AdminKeyMiddlewareFactory,
        HmacMiddlewareFactory,
        IpWhitelistMiddlewareFactory,
        JwtMiddlewareFactory,
        PAYSTACK_SIGNATURE_HEADER,
    },
    routes::{
        health,
        AddBankAccountRoute,
        AllOrdersRoute,
        CancelOrderRoute,
        CheckoutRoute,
        CheckoutSettingsRoute,
        CompleteOrderRoute,
        IssueTokenRoute,
        MyCardsRoute,
        MyOrdersRoute,
        MyTransactionsRoute,
        MyWithdrawalsRoute,
        OrderByIdRoute,
        PaystackWebhookRoute,
        PlatformAccountRoute,
        RateOrderRoute,
        RegisterDeviceRoute,
        RequestWithdrawalRoute,
        RequeueWithdrawalRoute,
        SaveCardRoute,
        UpdateCheckoutSettingsRoute,
        UpdateProgressRoute,
        WithdrawalsRoute,
    },
    workers::Workers,
};

const EVENT_BUFFER_SIZE: usize = 100;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let paystack = PaystackApi::new(config.paystack.api.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Paystack client. {e}")))?;
    let gateway = PaystackGateway::new(paystack);
    let push = PushService::from_config(&config.push)?;

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(db.clone(), push));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let workers = Workers::start(db.clone(), gateway.clone(), producers.clone(), &config.workers)?;
    let srv = create_server_instance(config, db, gateway, producers)?;
    let result = srv.await.map_err(ServerError::from);
    info!("🚀️ Server stopped. Shutting down the workers");
    workers.shutdown().await;
    result
}

/// Push notifications for new orders and delivery progress.
pub fn notification_hooks(db: SqliteDatabase, push: PushService) -> EventHooks {
    let dispatcher = NotificationDispatcher::new(db, push);
    let mut hooks = EventHooks::default();
    let on_placed = dispatcher.clone();
    hooks.on_order_placed(move |ev| {
        let dispatcher = on_placed.clone();
        async move { dispatcher.on_order_placed(ev).await }.boxed()
    });
    hooks.on_progress_updated(move |ev| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.on_progress_updated(ev).await }.boxed()
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: PaystackGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_mode(config.progress_mode);
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), producers.clone());
        let settlement_api =
            SettlementApi::new(db.clone(), producers.clone()).with_policy(config.fee_policy.policy());
        let cancellation_api = CancellationApi::new(db.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone(), gateway.clone(), producers.clone());
        let withdrawal_api = WithdrawalApi::new(db.clone(), gateway.clone(), producers.clone());
        let rating_api = RatingApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth.jwt_secret);
        let auth = config.auth.clone();
        let paystack = config.paystack.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bb::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(cancellation_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(withdrawal_api))
            .app_data(web::Data::new(rating_api))
            .app_data(web::Data::new(jwt_signer))
            .configure(move |cfg| configure_routes::<SqliteDatabase, PaystackGateway>(cfg, &auth, &paystack, options))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route along with the middleware that guards it. The API objects the handlers use must already be
/// in the app data.
///
/// Scopes do not fall through to one another, so `/api/admin` must be registered before `/api`.
pub fn configure_routes<B, G>(cfg: &mut ServiceConfig, auth: &AuthConfig, paystack: &PaystackSettings, options: ServerOptions)
where
    B: MarketplaceDatabase + 'static,
    G: PaymentGateway + 'static,
{
    let admin_scope = web::scope("/api/admin")
        .wrap(AdminKeyMiddlewareFactory::new(auth.admin_key.clone()))
        .service(AllOrdersRoute::<B>::new())
        .service(WithdrawalsRoute::<B, G>::new())
        .service(RequeueWithdrawalRoute::<B, G>::new())
        .service(CheckoutSettingsRoute::<B>::new())
        .service(UpdateCheckoutSettingsRoute::<B>::new())
        .service(PlatformAccountRoute::<B>::new())
        .service(IssueTokenRoute::<B>::new());
    // The whitelist wraps the signature check, so requests from unknown peers are turned away first
    let webhook_scope = web::scope("/webhook")
        .wrap(HmacMiddlewareFactory::new(PAYSTACK_SIGNATURE_HEADER, paystack.api.secret_key.clone()))
        .wrap(IpWhitelistMiddlewareFactory::new(paystack.whitelist.clone(), options))
        .service(PaystackWebhookRoute::<B, G>::new());
    let api_scope = web::scope("/api")
        .wrap(JwtMiddlewareFactory::new(TokenValidator::new(&auth.jwt_secret)))
        .service(MyOrdersRoute::<B>::new())
        .service(CheckoutRoute::<B, G>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(CompleteOrderRoute::<B>::new())
        .service(CancelOrderRoute::<B>::new())
        .service(UpdateProgressRoute::<B>::new())
        .service(RateOrderRoute::<B>::new())
        .service(RequestWithdrawalRoute::<B, G>::new())
        .service(MyTransactionsRoute::<B, G>::new())
        .service(MyWithdrawalsRoute::<B, G>::new())
        .service(MyCardsRoute::<B, G>::new())
        .service(SaveCardRoute::<B, G>::new())
        .service(AddBankAccountRoute::<B, G>::new())
        .service(RegisterDeviceRoute::<B, G>::new());
    cfg.service(health).service(admin_scope).service(webhook_scope).service(api_scope);
}
