use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    bb_api::errors::MarketplaceError,
    db::traits::{LedgerError, TopUpResult},
    db_types::{Card, DeviceToken, Kobo, NewCard, NewWithdrawalBank, UserId, WalletTransaction, WithdrawalBank},
    events::{EventProducers, WalletCreditedEvent},
    traits::PaymentGateway,
    MarketplaceDatabase,
};

/// The metadata `type` of a charge that tops up a wallet. Charges without a type are treated as top-ups too.
pub const WALLET_TOP_UP: &str = "wallet";

/// A successful charge reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeNotification {
    pub email: String,
    pub amount: Kobo,
    pub reference: String,
    /// The `type` the charge was tagged with when it was initiated
    pub purpose: Option<String>,
}

impl ChargeNotification {
    pub fn is_wallet_top_up(&self) -> bool {
        self.purpose.as_deref().map_or(true, |p| p == WALLET_TOP_UP)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankAccount {
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
    pub bank_name: String,
}

/// `WalletApi` handles money entering the platform and the payment instruments attached to a user.
pub struct WalletApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for WalletApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B, G> WalletApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> WalletApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Credits a wallet top-up to the user that owns the charge's e-mail address.
    ///
    /// Returns `None` if the charge was for something else (e.g. a card checkout). A charge whose reference was
    /// credited before is reported as [`TopUpResult::AlreadyApplied`] and changes nothing, so gateways may safely
    /// deliver the same event more than once.
    pub async fn process_charge_success(
        &self,
        charge: ChargeNotification,
    ) -> Result<Option<TopUpResult>, MarketplaceError> {
        if !charge.is_wallet_top_up() {
            debug!("💰️ Charge {} is not a wallet top-up ({:?}). Ignoring", charge.reference, charge.purpose);
            return Ok(None);
        }
        if charge.amount <= Kobo::default() {
            return Err(MarketplaceError::validation(format!("Top-up amount must be positive: {}", charge.amount)));
        }
        let result = self.db.credit_wallet_top_up(&charge.email, charge.amount, &charge.reference).await?;
        match &result {
            TopUpResult::Credited(tx) => {
                info!("💰️ Wallet of {} credited with {} ({})", tx.user_id, tx.amount, tx.payment_reference);
                self.producers.wallet_credited(WalletCreditedEvent::new(tx.clone())).await;
            },
            TopUpResult::AlreadyApplied(reference) => {
                info!("💰️ Top-up {reference} was delivered again. Nothing to do");
            },
        }
        Ok(Some(result))
    }

    pub async fn wallet_transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, MarketplaceError> {
        Ok(self.db.fetch_wallet_transactions(user_id).await?)
    }

    pub async fn cards(&self, user_id: &UserId) -> Result<Vec<Card>, MarketplaceError> {
        Ok(self.db.fetch_cards(user_id).await?)
    }

    /// Saves the card used in the card-tokenisation transaction `reference`. The transaction must belong to the user.
    pub async fn save_card(&self, user_id: &UserId, reference: &str) -> Result<Card, MarketplaceError> {
        if reference.trim().is_empty() {
            return Err(MarketplaceError::validation("Transaction reference is required"));
        }
        let user = self.db.fetch_user(user_id).await?.ok_or_else(|| LedgerError::UserNotFound(user_id.clone()))?;
        let verified = self.gateway.verify_transaction(reference.trim()).await?;
        if !verified.email.eq_ignore_ascii_case(&user.email) {
            warn!("💰️ {user_id} tried to save a card from a transaction that belongs to {}", verified.email);
            return Err(MarketplaceError::validation("This transaction does not belong to you"));
        }
        if !verified.reusable {
            return Err(MarketplaceError::validation("This card cannot be saved for future payments"));
        }
        let card = self.db.insert_card(user_id, NewCard::from(verified)).await?;
        info!("💰️ Card {} ({} {}) saved for {user_id}", card.id, card.bank, card.card_type);
        Ok(card)
    }

    /// Registers a payout bank account with the gateway and makes it the user's active withdrawal bank.
    pub async fn add_withdrawal_bank(
        &self,
        user_id: &UserId,
        account: NewBankAccount,
    ) -> Result<WithdrawalBank, MarketplaceError> {
        let number = account.account_number.trim();
        if number.len() != 10 || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(MarketplaceError::validation("Account number must be 10 digits"));
        }
        if account.bank_code.trim().is_empty() || account.account_name.trim().is_empty() {
            return Err(MarketplaceError::validation("Bank code and account name are required"));
        }
        if self.db.fetch_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id.clone()).into());
        }
        let recipient_code =
            self.gateway.create_transfer_recipient(account.account_name.trim(), number, account.bank_code.trim()).await?;
        let bank = NewWithdrawalBank {
            name: account.account_name.trim().to_string(),
            bank_name: account.bank_name,
            account_number: number.to_string(),
            recipient_code,
        };
        let bank = self.db.insert_withdrawal_bank(user_id, bank).await?;
        info!("💰️ Withdrawal bank #{} added for {user_id}", bank.id);
        Ok(bank)
    }

    pub async fn register_device(
        &self,
        user_id: &UserId,
        token: &str,
        device_type: &str,
    ) -> Result<DeviceToken, MarketplaceError> {
        if token.trim().is_empty() {
            return Err(MarketplaceError::validation("Device token is required"));
        }
        Ok(self.db.upsert_device_token(user_id, token.trim(), device_type.trim()).await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn top_up_purpose() {
        let mut charge = ChargeNotification {
            email: "ada@example.com".into(),
            amount: Kobo::from(500_000),
            reference: "T1234".into(),
            purpose: None,
        };
        assert!(charge.is_wallet_top_up());
        charge.purpose = Some("wallet".into());
        assert!(charge.is_wallet_top_up());
        charge.purpose = Some("card".into());
        assert!(!charge.is_wallet_top_up());
    }
}
