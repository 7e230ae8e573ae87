//! Vault Permissions - who may invoke what, with which argument constraints.
//!
//! The permission layer is split the way the rest of the vault core is:
//!
//! - [`EnumerableSelectorSet`] — the dense, swap-delete selector set backing
//!   each (actor, resource) grant entry
//! - [`Predicate`] — ordered argument constraints evaluated per call
//! - [`PermissionStore`] — grant/revoke/query over (actor, resource, selector)
//! - [`Authorizer`] — the pure authorization decision consulted by every task
//!
//! Authorization here is a decision, never an enforcement: callers receive a
//! named denial and decide how to abort.

#![deny(unsafe_code)]

pub mod authorizer;
pub mod predicate;
pub mod set;
pub mod store;

pub use authorizer::{Authorizer, AuthorizationError, GrantError, SELECTOR_GRANT, SELECTOR_REVOKE};
pub use predicate::{ParamClause, ParamOp, Predicate};
pub use set::EnumerableSelectorSet;
pub use store::{PermissionStore, StoreError};
