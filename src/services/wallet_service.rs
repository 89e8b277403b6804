//! Wallet service - balance and lifecycle operations on wallets.
//!
//! Every mutation goes through `WalletStore::with_wallet`, so it is applied
//! to freshly-read state under the wallet record's lock and committed as one
//! durable unit. Two concurrent mutations of the same wallet serialize;
//! operations on different wallets proceed independently. The balance rules
//! themselves live on the `Wallet` model.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::wallet::{Currency, Wallet};
use crate::store::WalletStore;

/// Orchestrates wallet persistence. Cheap to clone.
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn WalletStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Create the wallet for a user.
    ///
    /// # Errors
    ///
    /// - `Validation` if the initial balance is negative or over-precise
    /// - `Validation` if a wallet already exists for `user_id`
    pub async fn create_wallet(
        &self,
        user_id: Uuid,
        currency: Currency,
        initial_balance: Decimal,
    ) -> Result<Wallet, AppError> {
        let wallet = Wallet::new(user_id, currency, initial_balance)?;
        let wallet = self.store.insert(wallet).await?;
        tracing::info!(wallet_id = %wallet.id, user_id = %user_id, "wallet created");
        Ok(wallet)
    }

    /// Look up a wallet by id. `None` if absent.
    pub async fn get_wallet(&self, wallet_id: Uuid) -> Result<Option<Wallet>, AppError> {
        self.store.find_by_id(wallet_id).await
    }

    /// Look up a user's wallet. `None` if absent.
    pub async fn get_wallet_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Wallet>, AppError> {
        self.store.find_by_user_id(user_id).await
    }

    /// Add funds to the available balance. Wallet must be active.
    pub async fn add_balance(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(move |w| w.add(amount)))
            .await?;
        tracing::info!(wallet_id = %wallet_id, %amount, "balance added");
        Ok(wallet)
    }

    /// Remove funds from the available balance. Wallet must be active and
    /// hold at least `amount`.
    pub async fn deduct_balance(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(move |w| w.deduct(amount)))
            .await?;
        tracing::info!(wallet_id = %wallet_id, %amount, "balance deducted");
        Ok(wallet)
    }

    /// Move funds from the available balance into escrow.
    pub async fn move_to_escrow(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(move |w| w.move_to_escrow(amount)))
            .await?;
        tracing::info!(wallet_id = %wallet_id, %amount, "moved to escrow");
        Ok(wallet)
    }

    /// Move funds from escrow back into the available balance.
    pub async fn release_from_escrow(
        &self,
        wallet_id: Uuid,
        amount: Decimal,
    ) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(move |w| w.release_from_escrow(amount)))
            .await?;
        tracing::info!(wallet_id = %wallet_id, %amount, "released from escrow");
        Ok(wallet)
    }

    /// Suspend the wallet.
    pub async fn suspend_wallet(&self, wallet_id: Uuid) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(|w| w.suspend()))
            .await?;
        tracing::info!(wallet_id = %wallet_id, "wallet suspended");
        Ok(wallet)
    }

    /// Reactivate a suspended wallet.
    pub async fn activate_wallet(&self, wallet_id: Uuid) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(|w| w.activate()))
            .await?;
        tracing::info!(wallet_id = %wallet_id, "wallet activated");
        Ok(wallet)
    }

    /// Close the wallet permanently. Both balances must be zero.
    pub async fn close_wallet(&self, wallet_id: Uuid) -> Result<Wallet, AppError> {
        let wallet = self
            .store
            .with_wallet(wallet_id, Box::new(|w| w.close()))
            .await?;
        tracing::info!(wallet_id = %wallet_id, "wallet closed");
        Ok(wallet)
    }
}
