//! Vault Tasks - the task base state machine.
//!
//! A task is an independently configurable module requesting operations on a
//! central smart vault. Every call runs the same gated lifecycle:
//!
//! 1. **Authorizing** — the caller/selector/args decision via
//!    `vault-permissions`
//! 2. **PreValidating** — token/amount/acceptance/threshold gates, including
//!    zero-amount chaining from a previous balance connector
//! 3. **Executing** — the task-specific effect behind the [`Vault`] boundary
//! 4. **PostAccounting** — all-or-nothing balance-connector updates via
//!    `vault-connectors`
//!
//! Concrete kinds ([`CollectTask`], [`WithdrawTask`], [`ConnectorTask`])
//! compose the shared [`TaskEngine`] by explicit delegation.

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod selectors;
pub mod tasks;
pub mod vault;

pub use config::{AcceptancePolicy, AcceptanceType, TaskConfig, TaskRole, Threshold};
pub use engine::{CallOutcome, CallPhase, CallRequest, Realized, ResolvedCall, TaskEngine, TaskKind};
pub use error::{ConfigError, PolicyError, TaskError, VaultError};
pub use tasks::{CollectTask, ConnectorTask, WithdrawTask};
pub use vault::Vault;

#[cfg(test)]
mod tests;
