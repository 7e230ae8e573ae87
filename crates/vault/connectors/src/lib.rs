//! Vault Connectors - the balance-connector ledger.
//!
//! A balance connector is a named intermediate accounting bucket chaining one
//! task's output to another's input. The ledger is advisory relative to the
//! vault's real custody: it is intentionally stricter than a token balance
//! check, so wiring bugs between chained tasks surface as underflows here
//! before they become custody bugs there.
//!
//! The ledger treats every id (including the all-zero one) as an ordinary
//! key; rejecting the zero id is the configuration layer's job.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, warn};
use vault_types::{ConnectorId, TokenId};

/// Accounting failures. Fatal for the enclosing call: an underflow means two
/// chained tasks disagree about what was produced, and must never be clamped.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(
        "insufficient tracked balance on connector {connector} for {token}: \
         requested {requested}, tracked {tracked}"
    )]
    InsufficientTrackedBalance {
        connector: ConnectorId,
        token: TokenId,
        requested: u128,
        tracked: u128,
    },

    #[error("tracked balance overflow on connector {connector} for {token}")]
    BalanceOverflow {
        connector: ConnectorId,
        token: TokenId,
    },

    #[error("ledger lock poisoned")]
    Lock,
}

/// One signed ledger mutation, used to batch a call's accounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BalanceUpdate {
    Increase {
        connector: ConnectorId,
        token: TokenId,
        amount: u128,
    },
    Decrease {
        connector: ConnectorId,
        token: TokenId,
        amount: u128,
    },
}

/// Tracked per-(connector, token) balances.
#[derive(Debug, Default)]
pub struct BalanceConnectorLedger {
    balances: RwLock<HashMap<(ConnectorId, TokenId), u128>>,
}

impl BalanceConnectorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the tracked balance. Overflow is an error, never a wrap.
    pub fn increase(
        &self,
        connector: ConnectorId,
        token: &TokenId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write().map_err(|_| LedgerError::Lock)?;
        apply_increase(&mut balances, connector, token, amount)?;
        debug!(connector = %connector, token = %token, amount, "Connector balance increased");
        Ok(())
    }

    /// Subtract `amount` from the tracked balance. Underflow is fatal.
    pub fn decrease(
        &self,
        connector: ConnectorId,
        token: &TokenId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write().map_err(|_| LedgerError::Lock)?;
        apply_decrease(&mut balances, connector, token, amount)?;
        debug!(connector = %connector, token = %token, amount, "Connector balance decreased");
        Ok(())
    }

    /// Current tracked balance, zero when the key has never been touched.
    pub fn balance_of(&self, connector: ConnectorId, token: &TokenId) -> Result<u128, LedgerError> {
        let balances = self.balances.read().map_err(|_| LedgerError::Lock)?;
        Ok(balances
            .get(&(connector, token.clone()))
            .copied()
            .unwrap_or(0))
    }

    /// Apply a batch of updates all-or-nothing.
    ///
    /// Every update is validated against a scratch copy first; only when the
    /// whole batch is applicable is the real map swapped, all under one write
    /// lock. A failed batch leaves the ledger unchanged.
    pub fn apply(&self, updates: &[BalanceUpdate]) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut balances = self.balances.write().map_err(|_| LedgerError::Lock)?;
        let mut staged = balances.clone();
        for update in updates {
            match update {
                BalanceUpdate::Increase {
                    connector,
                    token,
                    amount,
                } => apply_increase(&mut staged, *connector, token, *amount)?,
                BalanceUpdate::Decrease {
                    connector,
                    token,
                    amount,
                } => apply_decrease(&mut staged, *connector, token, *amount)?,
            }
        }
        *balances = staged;
        debug!(updates = updates.len(), "Connector batch committed");
        Ok(())
    }
}

fn apply_increase(
    balances: &mut HashMap<(ConnectorId, TokenId), u128>,
    connector: ConnectorId,
    token: &TokenId,
    amount: u128,
) -> Result<(), LedgerError> {
    let slot = balances.entry((connector, token.clone())).or_insert(0);
    *slot = slot
        .checked_add(amount)
        .ok_or(LedgerError::BalanceOverflow {
            connector,
            token: token.clone(),
        })?;
    Ok(())
}

fn apply_decrease(
    balances: &mut HashMap<(ConnectorId, TokenId), u128>,
    connector: ConnectorId,
    token: &TokenId,
    amount: u128,
) -> Result<(), LedgerError> {
    let key = (connector, token.clone());
    let tracked = balances.get(&key).copied().unwrap_or(0);
    if amount > tracked {
        warn!(
            connector = %connector,
            token = %token,
            requested = amount,
            tracked,
            "Connector underflow"
        );
        return Err(LedgerError::InsufficientTrackedBalance {
            connector,
            token: token.clone(),
            requested: amount,
            tracked,
        });
    }

    let remaining = tracked - amount;
    if remaining == 0 {
        balances.remove(&key);
    } else {
        balances.insert(key, remaining);
    }
    Ok(())
}
