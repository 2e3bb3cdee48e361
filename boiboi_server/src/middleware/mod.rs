mod acl;
mod hmac;
mod jwt;
mod whitelist;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, PAYSTACK_SIGNATURE_HEADER};
pub use jwt::{AdminKeyMiddlewareFactory, AdminKeyMiddlewareService, JwtMiddlewareFactory, JwtMiddlewareService};
pub use whitelist::{IpWhitelistMiddlewareFactory, IpWhitelistMiddlewareService};
