//! IP allowlist middleware.
//!
//! Rejects requests whose remote address is not on the list with 403. The remote address is resolved with
//! [`get_remote_ip`], so it honours the proxy header settings in [`ServerOptions`]. A `None` list lets everything
//! through.

use std::{
    future::{ready, Ready},
    net::IpAddr,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    config::ServerOptions,
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
};

pub struct IpWhitelistMiddlewareFactory {
    whitelist: Option<Vec<IpAddr>>,
    options: ServerOptions,
}

impl IpWhitelistMiddlewareFactory {
    pub fn new(whitelist: Option<Vec<IpAddr>>, options: ServerOptions) -> Self {
        Self { whitelist, options }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IpWhitelistMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IpWhitelistMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IpWhitelistMiddlewareService {
            whitelist: self.whitelist.clone().map(Rc::new),
            options: self.options,
            service: Rc::new(service),
        }))
    }
}

pub struct IpWhitelistMiddlewareService<S> {
    whitelist: Option<Rc<Vec<IpAddr>>>,
    options: ServerOptions,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IpWhitelistMiddlewareService<S>
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
        let whitelist = self.whitelist.clone();
        let options = self.options;
        Box::pin(async move {
            let Some(whitelist) = whitelist else {
                return service.call(req).await;
            };
            let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
            let allowed = match peer_ip {
                Some(ip) => {
                    debug!("🔐️ Webhook call from {ip}");
                    whitelist.contains(&ip)
                },
                None => {
                    warn!("🔐️ No IP address found in webhook request. Denying access.");
                    false
                },
            };
            if allowed {
                service.call(req).await
            } else {
                warn!("🔐️ Webhook call from {peer_ip:?} is not on the whitelist. Denying access.");
                Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(
                    "Remote address is not allowed".into(),
                ))
                .into())
            }
        })
    }
}
