//! HMAC middleware for Actix Web.
//!
//! Paystack signs every webhook call with an HMAC-SHA512 of the raw request body, keyed with the account's secret key.
//! The hex-encoded signature is sent in the `x-paystack-signature` header.
//!
//! Wrap the webhook scope in this middleware. Requests without a signature, or with one that doesn't match the body,
//! are rejected with 401 before they reach a handler. The check cannot be switched off.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorUnauthorized},
    web,
    Error,
};
use boiboi_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::helpers::verify_signature;

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let hmac_header = self.hmac_header.clone();
        Box::pin(async move {
            trace!("🔐️ Checking HMAC for request");
            let signature = req
                .headers()
                .get(&hmac_header)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| {
                    warn!("🔐️ No HMAC signature found in request. Denying access.");
                    ErrorUnauthorized("No HMAC signature found.")
                })?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            if verify_signature(&secret, data.as_ref(), &signature) {
                trace!("🔐️ HMAC check for request ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid HMAC signature found in request. Denying access.");
                Err(ErrorUnauthorized("Invalid HMAC signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
