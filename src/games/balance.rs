//! Balance store: per-user balance records with a write-through cache
//!
//! Loading never fails; a missing or unreadable record is an empty account.
//! Commits hit the backend first and only then the cache, so a failed write
//! leaves the cached balance at its pre-commit value.

use crate::config::StorageConfig;
use crate::errors::{HoopshotResult, StorageError};
use crate::games::types::{Account, UserId};
use crate::storage::KvBackend;
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::Arc;

pub struct BalanceStore {
    backend: Arc<dyn KvBackend>,
    key_prefix: String,
    cache: DashMap<UserId, Decimal>,
}

impl BalanceStore {
    pub fn new(backend: Arc<dyn KvBackend>, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
            cache: DashMap::new(),
        }
    }

    pub fn from_config(backend: Arc<dyn KvBackend>, config: &StorageConfig) -> Self {
        Self::new(backend, config.key_prefix.clone())
    }

    fn record_key(&self, user_id: &UserId) -> Vec<u8> {
        format!("{}{}", self.key_prefix, user_id).into_bytes()
    }

    /// Reload the account from persistence, replacing any cached balance.
    pub fn load(&self, user_id: &UserId) -> Account {
        let balance = self.read_persisted(user_id);
        self.cache.insert(user_id.clone(), balance);

        Account {
            user_id: user_id.clone(),
            balance,
        }
    }

    fn read_persisted(&self, user_id: &UserId) -> Decimal {
        let bytes = match self.backend.get(&self.record_key(user_id)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Decimal::ZERO,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Balance read failed, defaulting to zero");
                return Decimal::ZERO;
            }
        };

        parse_balance(&bytes).unwrap_or_else(|e| {
            tracing::warn!(%user_id, error = %e, "Balance record rejected, defaulting to zero");
            Decimal::ZERO
        })
    }

    /// Cached balance; loads on first access.
    pub fn get(&self, user_id: &UserId) -> Decimal {
        if let Some(balance) = self.cache.get(user_id) {
            return *balance;
        }
        self.load(user_id).balance
    }

    /// Persist `new_balance`, overwriting the prior record, then update the cache.
    pub(crate) fn commit(&self, user_id: &UserId, new_balance: Decimal) -> HoopshotResult<()> {
        let key = self.record_key(user_id);
        self.backend.put(&key, new_balance.to_string().as_bytes())?;
        self.cache.insert(user_id.clone(), new_balance);

        tracing::debug!(%user_id, balance = %new_balance, "Balance committed");
        Ok(())
    }
}

fn parse_balance(bytes: &[u8]) -> Result<Decimal, StorageError> {
    let raw = String::from_utf8_lossy(bytes);
    let text = raw.trim();
    let value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| StorageError::CorruptedData(format!("'{}' is not a decimal", text)))?;

    if value.is_sign_negative() {
        return Err(StorageError::CorruptedData(format!("negative balance {}", value)));
    }
    Ok(value)
}

/// Two-decimal display form of a balance or amount
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
