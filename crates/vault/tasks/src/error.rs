//! The task error taxonomy.
//!
//! Four failure families stay distinguishable all the way to the caller:
//! configuration problems (setter-side, state unchanged), authorization
//! denials ("who"), policy violations ("what"), and accounting faults.
//! External vault/connector failures propagate unchanged and are never
//! retried.

use crate::config::TaskRole;
use thiserror::Error;
use vault_connectors::LedgerError;
use vault_permissions::AuthorizationError;
use vault_types::{ActorId, FixedPoint, TokenId};

/// Rejected synchronously at a setter call; no state was changed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("zero connector id where a concrete connector is required")]
    ZeroConnectorId,

    #[error("previous and next balance connectors must be distinct")]
    ConnectorsNotDistinct,

    #[error("a {role} task cannot have a previous balance connector")]
    PreviousConnectorForbidden { role: TaskRole },

    #[error("a {role} task cannot have a next balance connector")]
    NextConnectorForbidden { role: TaskRole },

    #[error("zero address for {field}")]
    ZeroAddress { field: &'static str },

    #[error("recipient {recipient} equals the vault")]
    RecipientIsVault { recipient: ActorId },

    #[error("slippage {value} above one")]
    SlippageAboveOne { value: FixedPoint },

    #[error("invalid threshold: min {min} above max {max}")]
    InvalidThreshold { min: u128, max: u128 },

    #[error("zero destination chain id")]
    ZeroDestinationChain,

    #[error("zero token in {context}")]
    ZeroToken { context: &'static str },

    #[error("no external connector configured for this task")]
    ConnectorNotSet,

    #[error("no recipient configured for this task")]
    RecipientNotSet,

    #[error("task config lock poisoned")]
    Lock,
}

/// Aborts after authorization succeeds but before execution.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("zero token")]
    TokenZero,

    #[error("zero amount")]
    AmountZero,

    #[error("token {token} not accepted by this task")]
    TokenNotAccepted { token: TokenId },

    #[error("threshold not met for {token}: amount {amount} below min {min}")]
    BelowThreshold {
        token: TokenId,
        amount: u128,
        min: u128,
    },

    #[error("threshold exceeded for {token}: amount {amount} above max {max}")]
    AboveThreshold {
        token: TokenId,
        amount: u128,
        max: u128,
    },
}

/// Failure of the underlying vault or external connector operation.
#[derive(Debug, Error)]
#[error("vault operation {operation} failed: {message}")]
pub struct VaultError {
    pub operation: &'static str,
    pub message: String,
}

impl VaultError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Everything a task call or setter can surface.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Accounting(#[from] LedgerError),

    #[error(transparent)]
    External(#[from] VaultError),
}
