//! Bearer-token authentication.
//!
//! [`JwtMiddlewareFactory`] validates the `Authorization: Bearer <jwt>` header and stores the token's claims in the
//! request extensions, where [`crate::auth::JwtClaims`] picks them up as an extractor.
//!
//! [`AdminKeyMiddlewareFactory`] guards the admin scope. Its bearer token is a static key rather than a JWT.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use boiboi_common::Secret;
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::TokenValidator,
    errors::{AuthError, ServerError},
};

fn bearer_token(req: &ServiceRequest) -> Result<String, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a bearer token".into()))
}

//--------------------------------------------------  JWT  -------------------------------------------------------------
pub struct JwtMiddlewareFactory {
    validator: TokenValidator,
}

impl JwtMiddlewareFactory {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { validator: Rc::new(self.validator.clone()), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    validator: Rc<TokenValidator>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let validator = Rc::clone(&self.validator);
        Box::pin(async move {
            let claims = bearer_token(&req).and_then(|token| validator.validate(&token)).map_err(|e| {
                debug!("🔐️ Rejecting request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

//--------------------------------------------------  Admin key  -------------------------------------------------------
pub struct AdminKeyMiddlewareFactory {
    key: Secret<String>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        Self { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.reveal().clone();
        Box::pin(async move {
            let token = bearer_token(&req).map_err(ServerError::AuthenticationError)?;
            if token.as_bytes().len() == key.as_bytes().len() &&
                token.bytes().zip(key.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
            {
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin key presented for {}", req.path());
                Err(ServerError::AuthenticationError(AuthError::ValidationError("Invalid admin key".into())).into())
            }
        })
    }
}
