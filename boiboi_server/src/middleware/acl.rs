//! Access control list middleware.
//! This middleware can be placed on any route or service that sits behind the JWT middleware.
//!
//! It checks the role in the request's JWT claims against the roles allowed on the route. Every user has exactly one
//! role, so a request is allowed if its role is any one of the allowed roles. Otherwise, a 403 Forbidden response is
//! returned.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use boiboi_engine::db_types::UserRole;
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<UserRole>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[UserRole]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<UserRole>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let role = req.extensions().get::<JwtClaims>().map(|c| c.role).ok_or_else(|| {
                warn!("🔐️ No JWT claims found in request extensions");
                ServerError::AuthenticationError(AuthError::MissingToken)
            })?;
            if allowed_roles.contains(&role) {
                service.call(req).await
            } else {
                debug!("🔐️ Role {role} may not access {}", req.path());
                let allowed = allowed_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(format!(
                    "This action requires one of these roles: {allowed}"
                )))
                .into())
            }
        })
    }
}
