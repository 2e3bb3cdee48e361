mod admin;
mod auth;
mod checkout;
mod helpers;
pub mod mocks;
mod orders;
mod webhook;
