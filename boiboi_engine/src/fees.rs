//! Service-fee policies used when an order is settled.
//!
//! A policy only does arithmetic. The settlement transaction reads the checkout settings, asks the policy for a
//! [`FeeSplit`] and applies the resulting credits. Every policy must conserve money:
//! `to_store + to_rider + to_platform == price`, with `to_rider` equal to the delivery fee.
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{CheckoutSettings, Kobo};

const BPS_100_PERCENT: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("The delivery fee ({delivery_fee}) exceeds the order price ({price})")]
    NegativeSubtotal { price: Kobo, delivery_fee: Kobo },
    #[error("Invalid checkout settings: {0}")]
    InvalidSettings(String),
}

/// The result of splitting an order's payment between the store, the rider and the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSplit {
    pub subtotal: Kobo,
    pub service_fee: Kobo,
    pub to_store: Kobo,
    pub to_rider: Kobo,
    pub to_platform: Kobo,
}

pub trait FeePolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn split(&self, price: Kobo, delivery_fee: Kobo, settings: &CheckoutSettings) -> Result<FeeSplit, FeeError>;
}

fn subtotal_of(price: Kobo, delivery_fee: Kobo) -> Result<Kobo, FeeError> {
    let subtotal = price - delivery_fee;
    if subtotal.is_negative() {
        return Err(FeeError::NegativeSubtotal { price, delivery_fee });
    }
    Ok(subtotal)
}

//--------------------------------------   TieredFeePolicy   ---------------------------------------------------------
/// The service fee is a percentage of the subtotal that grows with the order size:
///
/// | Subtotal                 | Fee |
/// |--------------------------|-----|
/// | up to ₦5000.00           | 3%  |
/// | up to ₦9999.00           | 5%  |
/// | anything larger          | 7%  |
///
/// The store receives the subtotal less the fee, and the platform keeps the fee.
#[derive(Debug, Clone, Copy, Default)]
pub struct TieredFeePolicy;

impl TieredFeePolicy {
    pub const LOW_TIER_CEILING: Kobo = Kobo::from_naira(5_000);
    pub const MID_TIER_CEILING: Kobo = Kobo::from_naira(9_999);

    /// The fee rate, in basis points, for the given subtotal.
    pub fn rate_bps(subtotal: Kobo) -> u32 {
        if subtotal <= Self::LOW_TIER_CEILING {
            300
        } else if subtotal <= Self::MID_TIER_CEILING {
            500
        } else {
            700
        }
    }
}

impl FeePolicy for TieredFeePolicy {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn split(&self, price: Kobo, delivery_fee: Kobo, _settings: &CheckoutSettings) -> Result<FeeSplit, FeeError> {
        let subtotal = subtotal_of(price, delivery_fee)?;
        let service_fee = subtotal.percent_bps(Self::rate_bps(subtotal));
        Ok(FeeSplit {
            subtotal,
            service_fee,
            to_store: subtotal - service_fee,
            to_rider: delivery_fee,
            to_platform: service_fee,
        })
    }
}

//--------------------------------------   PercentFeePolicy  ---------------------------------------------------------
/// Legacy policy: the store receives a fixed share of the subtotal taken from the checkout settings and the platform
/// keeps the remainder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentFeePolicy;

impl FeePolicy for PercentFeePolicy {
    fn name(&self) -> &'static str {
        "percent"
    }

    fn split(&self, price: Kobo, delivery_fee: Kobo, settings: &CheckoutSettings) -> Result<FeeSplit, FeeError> {
        let store_bps = settings.store_percent_bps;
        if !(0..=BPS_100_PERCENT).contains(&store_bps) {
            return Err(FeeError::InvalidSettings(format!("store share of {store_bps} bps is out of range")));
        }
        let subtotal = subtotal_of(price, delivery_fee)?;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let to_store = subtotal.percent_bps(store_bps as u32);
        let service_fee = subtotal - to_store;
        Ok(FeeSplit { subtotal, service_fee, to_store, to_rider: delivery_fee, to_platform: service_fee })
    }
}
