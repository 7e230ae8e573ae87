//! The vault boundary.
//!
//! The vault is authoritative for actual asset custody; this core only asks
//! it to move funds and observes the realized amounts it reports. Connector
//! calls pass opaque encoded data through — the core never inspects adapter
//! internals, only balance deltas.

use crate::error::VaultError;
use vault_types::{ActorId, TokenId};

/// External collaborator holding the assets every task operates on.
///
/// Each operation returns the realized amount (the observed balance delta),
/// which can differ from the requested amount for operations with slippage
/// or fees. Failures propagate unchanged; the core adds no retry logic.
pub trait Vault {
    /// Pull `amount` of `token` from `from` into the vault.
    fn collect(
        &mut self,
        token: &TokenId,
        from: &ActorId,
        amount: u128,
    ) -> Result<u128, VaultError>;

    /// Send `amount` of `token` from the vault to `recipient`.
    fn withdraw(
        &mut self,
        token: &TokenId,
        recipient: &ActorId,
        amount: u128,
    ) -> Result<u128, VaultError>;

    /// Execute an opaque call against an external connector adapter and
    /// report the realized output amount.
    fn execute(&mut self, connector: &ActorId, data: &[u8]) -> Result<u128, VaultError>;
}
