//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a few lines MUST push their logic down into the engine APIs. Keep this module neat and
//! tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use actix_web::{get, web, HttpResponse, Responder};
use boiboi_engine::{
    db_types::{CheckoutSettings, Order, OrderId, UserRole, WithdrawalId},
    order_objects::CheckoutRequest,
    traits::PaymentGateway,
    AccountManagement,
    CancellationApi,
    CheckoutApi,
    LedgerError,
    MarketplaceDatabase,
    MarketplaceError,
    NewBankAccount,
    OrderFlowApi,
    OrderQueryFilter,
    RatingApi,
    SettlementApi,
    WalletApi,
    WithdrawalApi,
    WithdrawalFilter,
};
use chrono::Duration;
use log::*;
use paystack_tools::PaystackEvent;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    data_objects::{
        CompleteOrderRequest,
        HealthResponse,
        JsonResponse,
        OrderSearchParams,
        ProgressUpdateRequest,
        RatingRequest,
        RegisterDeviceRequest,
        SaveCardRequest,
        TokenRequest,
        TokenResponse,
        WithdrawalRequestBody,
        WithdrawalSearchParams,
    },
    errors::ServerError,
    integrations::paystack::charge_notification,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Generic handlers list their trait bounds after `impl`, in the same order as the handler's type parameters. Roles
// after `requires` are checked by the ACL middleware; any one of them grants access.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        $crate::route!(@generic $name, $method, $path, [$($bounds),+], []);
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        $crate::route!(@generic $name, $method, $path, [$($bounds),+], [$($roles),+]);
    };

    (@generic $name:ident, $method:ident, $path:literal, [$($bounds:ident),+], [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds >],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds >] >,)+ );}
        paste::paste! { impl< $( [< T $bounds >],)+ > [<$name:camel Route>]< $( [< T $bounds >],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds >] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds>],)+>
        where
            $([<T $bounds>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds >], )+>);
                $crate::route!(@register res, config, [$($roles),*]);
            }
        }}
    };

    (@register $res:ident, $config:ident, []) => {
        actix_web::dev::HttpServiceFactory::register($res, $config);
    };

    (@register $res:ident, $config:ident, [$($roles:expr),+]) => {
        let $res = $res.wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
        actix_web::dev::HttpServiceFactory::register($res, $config);
    };
}

fn parse_path<T: std::str::FromStr>(value: String) -> Result<T, ServerError>
where T::Err: std::fmt::Display {
    value.parse::<T>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/api/ping")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(HealthResponse::ok())
}

//----------------------------------------------   Orders  ----------------------------------------------------

/// Narrows an order search to what the caller may see. Customers see their own orders and merchants see their store's
/// orders. Riders see the whole board, since they pick up orders that nobody has accepted yet.
async fn scope_order_filter<B: AccountManagement>(
    db: &B,
    claims: &JwtClaims,
    filter: OrderQueryFilter,
) -> Result<OrderQueryFilter, ServerError> {
    match claims.role {
        UserRole::Customer => Ok(filter.with_customer_id(claims.sub.clone())),
        UserRole::Rider => Ok(filter),
        UserRole::Merchant => {
            let user = db.fetch_user(&claims.sub).await?.ok_or(LedgerError::UserNotFound(claims.sub.clone()))?;
            let store_id = user
                .store_id
                .ok_or_else(|| ServerError::InsufficientPermissions("You are not attached to a store".into()))?;
            Ok(filter.with_store_id(store_id))
        },
    }
}

async fn is_order_visible<B: AccountManagement>(
    db: &B,
    claims: &JwtClaims,
    order: &Order,
) -> Result<bool, ServerError> {
    let visible = match claims.role {
        UserRole::Customer => order.customer_id == claims.sub,
        UserRole::Rider => true,
        UserRole::Merchant => {
            let user = db.fetch_user(&claims.sub).await?;
            user.and_then(|u| u.store_id).is_some_and(|s| s == order.store_id)
        },
    };
    Ok(visible)
}

async fn fetch_visible_order<B: MarketplaceDatabase>(
    api: &OrderFlowApi<B>,
    claims: &JwtClaims,
    order_id: &OrderId,
) -> Result<Order, ServerError> {
    let order = api.fetch_order(order_id).await?;
    match order {
        Some(order) if is_order_visible(api.db(), claims, &order).await? => Ok(order),
        _ => Err(ServerError::NoRecordFound(format!("Order {order_id} not found"))),
    }
}

route!(my_orders => Get "/orders" impl MarketplaceDatabase);
/// Searches orders. The query may filter on `storeId`, `riderId`, `customerId` and `status`, and is further narrowed
/// to the orders the caller may see.
pub async fn my_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter().map_err(ServerError::InvalidRequestBody)?;
    let filter = scope_order_filter(api.db(), &claims, filter).await?;
    debug!("💻️ GET orders for {} with {filter:?}", claims.sub);
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl MarketplaceDatabase);
pub async fn order_by_id<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_path::<OrderId>(path.into_inner())?;
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = fetch_visible_order(&api, &claims, &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(checkout => Post "/orders/checkout" impl MarketplaceDatabase, PaymentGateway where requires [UserRole::Customer]);
pub async fn checkout<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST checkout for {}", claims.sub);
    let order = api.checkout(&claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(complete_order => Post "/orders/{order_id}/complete" impl MarketplaceDatabase);
/// Completes a delivered order and settles it. The caller must be the order's customer or its rider, and must know
/// the order's pickup code.
pub async fn complete_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<CompleteOrderRequest>,
    orders: web::Data<OrderFlowApi<B>>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_path::<OrderId>(path.into_inner())?;
    let order = fetch_visible_order(&orders, &claims, &order_id).await?;
    if order.customer_id != claims.sub && order.rider_id.as_ref() != Some(&claims.sub) {
        return Err(LedgerError::NotOrderParticipant(claims.sub).into());
    }
    debug!("💻️ POST complete order {order_id} by {}", claims.sub);
    let settlement = api.complete_order(&order_id, &body.code).await?;
    Ok(HttpResponse::Ok().json(settlement))
}

route!(cancel_order => Patch "/orders/{order_id}/cancel" impl MarketplaceDatabase);
pub async fn cancel_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<CancellationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_path::<OrderId>(path.into_inner())?;
    debug!("💻️ PATCH cancel order {order_id} by {}", claims.sub);
    let cancellation = api.cancel_order(&order_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(cancellation))
}

route!(update_progress => Patch "/orders/{order_id}/orderProgress" impl MarketplaceDatabase where requires [UserRole::Rider, UserRole::Merchant]);
pub async fn update_progress<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ProgressUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_path::<OrderId>(path.into_inner())?;
    let status = body.into_inner().status;
    let order = fetch_visible_order(&api, &claims, &order_id).await?;
    // Once accepted, only the assigned rider moves the order along
    if claims.role == UserRole::Rider && order.rider_id.as_ref().is_some_and(|r| r != &claims.sub) {
        return Err(LedgerError::NotOrderParticipant(claims.sub).into());
    }
    debug!("💻️ PATCH progress of order {order_id} to {status} by {}", claims.sub);
    let order = api.update_progress(&order_id, status, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(rate_order => Patch "/orders/{order_id}/rating" impl MarketplaceDatabase where requires [UserRole::Customer]);
pub async fn rate_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<RatingRequest>,
    api: web::Data<RatingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_path::<OrderId>(path.into_inner())?;
    let RatingRequest { rider_rating, vendor_rating } = body.into_inner();
    debug!("💻️ PATCH rating of order {order_id} by {}", claims.sub);
    let order = api.rate_order(&order_id, &claims.sub, rider_rating, vendor_rating).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Wallet  ----------------------------------------------------

route!(request_withdrawal => Post "/wallet/withdrawals" impl MarketplaceDatabase, PaymentGateway where requires [UserRole::Merchant, UserRole::Rider]);
pub async fn request_withdrawal<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<WithdrawalRequestBody>,
    api: web::Data<WithdrawalApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let amount = body.amount;
    debug!("💻️ POST withdrawal of {amount} for {}", claims.sub);
    let request = api.request_withdrawal(&claims.sub, amount).await?;
    Ok(HttpResponse::Created().json(request))
}

route!(my_transactions => Get "/user/wallet/transactions" impl MarketplaceDatabase, PaymentGateway);
pub async fn my_transactions<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET wallet transactions for {}", claims.sub);
    let transactions = api.wallet_transactions(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

route!(my_withdrawals => Get "/user/wallet/withdrawalRequests" impl MarketplaceDatabase, PaymentGateway);
pub async fn my_withdrawals<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    api: web::Data<WithdrawalApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawal requests for {}", claims.sub);
    let filter = WithdrawalFilter { user_id: Some(claims.sub), status: None };
    let requests = api.withdrawal_requests(filter).await?;
    Ok(HttpResponse::Ok().json(requests))
}

route!(my_cards => Get "/user/cards" impl MarketplaceDatabase, PaymentGateway);
pub async fn my_cards<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let cards = api.cards(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(cards))
}

route!(save_card => Post "/user/cards" impl MarketplaceDatabase, PaymentGateway);
/// Saves the card used in a successful card-tokenisation transaction, identified by its gateway reference.
pub async fn save_card<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<SaveCardRequest>,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST card from transaction {} for {}", body.reference, claims.sub);
    let card = api.save_card(&claims.sub, &body.reference).await?;
    Ok(HttpResponse::Created().json(card))
}

route!(add_bank_account => Post "/user/bankAccount" impl MarketplaceDatabase, PaymentGateway where requires [UserRole::Merchant, UserRole::Rider]);
pub async fn add_bank_account<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<NewBankAccount>,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST bank account for {}", claims.sub);
    let bank = api.add_withdrawal_bank(&claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(bank))
}

route!(register_device => Post "/notifications/registerDevice" impl MarketplaceDatabase, PaymentGateway);
pub async fn register_device<B: MarketplaceDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<RegisterDeviceRequest>,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let RegisterDeviceRequest { token, device_type } = body.into_inner();
    api.register_device(&claims.sub, &token, &device_type).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Device registered")))
}

//----------------------------------------------   Admin  ----------------------------------------------------

route!(all_orders => Get "/orders" impl MarketplaceDatabase);
pub async fn all_orders<B: MarketplaceDatabase>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter().map_err(ServerError::InvalidRequestBody)?;
    debug!("💻️ GET admin orders search for {filter:?}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(withdrawals => Get "/withdrawals" impl MarketplaceDatabase, PaymentGateway);
pub async fn withdrawals<B: MarketplaceDatabase, G: PaymentGateway>(
    query: web::Query<WithdrawalSearchParams>,
    api: web::Data<WithdrawalApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter().map_err(ServerError::InvalidRequestBody)?;
    let requests = api.withdrawal_requests(filter).await?;
    Ok(HttpResponse::Ok().json(requests))
}

route!(requeue_withdrawal => Post "/withdrawals/{id}/requeue" impl MarketplaceDatabase, PaymentGateway);
pub async fn requeue_withdrawal<B: MarketplaceDatabase, G: PaymentGateway>(
    path: web::Path<String>,
    api: web::Data<WithdrawalApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let id = parse_path::<WithdrawalId>(path.into_inner())?;
    info!("💻️ Requeueing withdrawal request {id}");
    let request = api.requeue(&id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(checkout_settings => Get "/settings/checkout" impl MarketplaceDatabase);
pub async fn checkout_settings<B: MarketplaceDatabase>(
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settings = api
        .checkout_settings()
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("No checkout settings have been saved".into()))?;
    Ok(HttpResponse::Ok().json(settings))
}

route!(update_checkout_settings => Put "/settings/checkout" impl MarketplaceDatabase);
pub async fn update_checkout_settings<B: MarketplaceDatabase>(
    body: web::Json<CheckoutSettings>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settings = api.update_checkout_settings(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

route!(platform_account => Get "/platform" impl MarketplaceDatabase);
pub async fn platform_account<B: MarketplaceDatabase>(
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let account = api.platform_account().await?;
    Ok(HttpResponse::Ok().json(account))
}

route!(issue_token => Post "/token" impl MarketplaceDatabase);
/// Issues an access token for any user, with the role they hold. Support staff use this to act on a user's behalf.
pub async fn issue_token<B: MarketplaceDatabase>(
    body: web::Json<TokenRequest>,
    api: web::Data<OrderFlowApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let TokenRequest { user_id, lifetime } = body.into_inner();
    let user_id = user_id.parse().map_err(|e| ServerError::InvalidRequestBody(format!("{e}")))?;
    let user = api.db().fetch_user(&user_id).await?.ok_or(LedgerError::UserNotFound(user_id))?;
    let access_token = signer.issue_token(user.id.clone(), user.role, lifetime.map(Duration::minutes))?;
    info!("💻️ Issued an access token for {} ({})", user.id, user.role);
    Ok(HttpResponse::Ok().json(TokenResponse { access_token }))
}

//----------------------------------------------   Webhook  ----------------------------------------------------

route!(paystack_webhook => Post "/paystack" impl MarketplaceDatabase, PaymentGateway);
/// Paystack webhook. By the time a request gets here, its signature and origin have been checked by middleware.
///
/// Verified events are acknowledged with 200 even when nothing could be done with them, so Paystack stops
/// redelivering. The exception is a storage failure, which answers 500 so that the event is retried; top-ups are
/// idempotent on their reference, so a retry cannot credit twice.
pub async fn paystack_webhook<B: MarketplaceDatabase, G: PaymentGateway>(
    body: web::Bytes,
    api: web::Data<WalletApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let event = PaystackEvent::from_slice(&body).map_err(|e| {
        warn!("💻️ Could not parse Paystack webhook. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let response = match event {
        PaystackEvent::ChargeSuccess(charge) => {
            let reference = charge.reference.clone();
            info!("💻️ charge.success received for {reference}");
            match api.process_charge_success(charge_notification(charge)).await {
                Ok(Some(_)) => JsonResponse::success(format!("Charge {reference} processed")),
                Ok(None) => JsonResponse::success(format!("Charge {reference} is not a wallet top-up")),
                Err(MarketplaceError::Ledger(e @ (LedgerError::DatabaseError(_) | LedgerError::Busy(_)))) => {
                    return Err(e.into())
                },
                Err(e) => {
                    warn!("💻️ Could not apply charge {reference}. {e}");
                    JsonResponse::failure(e)
                },
            }
        },
        PaystackEvent::ChargeFailed(charge) => {
            info!("💻️ charge.failed for {} ({})", charge.reference, charge.gateway_response);
            JsonResponse::success("Noted")
        },
        PaystackEvent::TransferSuccess(transfer) => {
            info!("💻️ transfer.success for {} ({}, id {})", transfer.reference, transfer.amount, transfer.id);
            JsonResponse::success("Noted")
        },
        PaystackEvent::Other(name) => {
            debug!("💻️ Ignoring Paystack event {name}");
            JsonResponse::success("Ignored")
        },
    };
    Ok(HttpResponse::Ok().json(response))
}
