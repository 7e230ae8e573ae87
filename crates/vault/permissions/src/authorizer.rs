//! The authorization decision surface.
//!
//! `authorize` is pure: it consults the permission store and the predicate
//! evaluator and returns a named denial without touching any state.
//! Enforcement (aborting the call) belongs to the invoking task.
//!
//! Permission management (`grant`/`revoke`) is itself authorized. The
//! designated admin bypasses the check for those two selectors only — never
//! for task execution or setters — which allows bootstrap without opening a
//! privilege-escalation loop.

use crate::predicate::Predicate;
use crate::store::{PermissionStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};
use vault_types::{ActorId, ParamValue, ResourceId, Selector};

/// Selector under which grants are authorized.
pub const SELECTOR_GRANT: &str = "grant";
/// Selector under which revocations are authorized.
pub const SELECTOR_REVOKE: &str = "revoke";

/// Denials surfaced to callers. Distinct from policy failures so operators
/// can tell "who" problems from "what" problems.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("actor {actor} is not allowed to call {selector} on {resource}")]
    NotAllowed {
        actor: ActorId,
        resource: ResourceId,
        selector: Selector,
    },

    #[error("arguments rejected by predicate: actor {actor} calling {selector} on {resource}")]
    PredicateRejected {
        actor: ActorId,
        resource: ResourceId,
        selector: Selector,
    },

    #[error("permission store lock poisoned")]
    Store,
}

impl From<StoreError> for AuthorizationError {
    fn from(_: StoreError) -> Self {
        Self::Store
    }
}

/// Errors from permission management calls.
#[derive(Debug, Error)]
pub enum GrantError {
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    #[error("predicate clause index {index} out of range for {selector} (arity {arity})")]
    ClauseIndexOutOfRange {
        selector: Selector,
        index: usize,
        arity: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evaluates whether an actor may invoke an operation with given arguments.
pub struct Authorizer {
    admin: ActorId,
    store: Arc<PermissionStore>,
    /// Known argument counts per selector, fed by task registration. Grants
    /// against registered selectors are bounds-checked eagerly.
    arities: RwLock<HashMap<Selector, usize>>,
}

impl Authorizer {
    pub fn new(admin: ActorId) -> Self {
        Self::with_store(admin, Arc::new(PermissionStore::new()))
    }

    pub fn with_store(admin: ActorId, store: Arc<PermissionStore>) -> Self {
        Self {
            admin,
            store,
            arities: RwLock::new(HashMap::new()),
        }
    }

    pub fn admin(&self) -> &ActorId {
        &self.admin
    }

    pub fn store(&self) -> Arc<PermissionStore> {
        Arc::clone(&self.store)
    }

    /// Register the argument count of a selector so grants against it can be
    /// validated at grant time.
    pub fn register_selector_arity(&self, selector: Selector, arity: usize) {
        if let Ok(mut arities) = self.arities.write() {
            arities.insert(selector, arity);
        }
    }

    /// The pure authorization decision.
    ///
    /// Membership is checked first; a missing permission denies immediately
    /// without evaluating any predicate. An empty predicate always passes.
    pub fn authorize(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
        args: &[ParamValue],
    ) -> Result<(), AuthorizationError> {
        if self.is_management_bypass(actor, selector) {
            debug!(actor = %actor, selector = %selector, "Admin bypass for permission management");
            return Ok(());
        }

        if !self.store.has_permission(actor, resource, selector)? {
            debug!(
                actor = %actor,
                resource = %resource,
                selector = %selector,
                "Denied: no permission"
            );
            return Err(AuthorizationError::NotAllowed {
                actor: actor.clone(),
                resource: resource.clone(),
                selector: selector.clone(),
            });
        }

        let predicate = self
            .store
            .predicate(actor, resource, selector)?
            .unwrap_or_default();
        if !predicate.evaluate(args) {
            warn!(
                actor = %actor,
                resource = %resource,
                selector = %selector,
                "Denied: predicate unsatisfied"
            );
            return Err(AuthorizationError::PredicateRejected {
                actor: actor.clone(),
                resource: resource.clone(),
                selector: selector.clone(),
            });
        }

        debug!(actor = %actor, resource = %resource, selector = %selector, "Authorized");
        Ok(())
    }

    /// Boolean convenience over [`Self::authorize`].
    pub fn is_authorized(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
        args: &[ParamValue],
    ) -> bool {
        self.authorize(actor, resource, selector, args).is_ok()
    }

    /// Grant `selector` on `resource` to `actor`.
    ///
    /// The caller is authorized under the `grant` selector with arguments
    /// `[actor, selector]`, so a delegated granter can itself be scoped to
    /// specific grantees or operations. Predicate indices are bounds-checked
    /// against the selector's registered arity when one is known.
    pub fn grant(
        &self,
        caller: &ActorId,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
        predicate: Predicate,
    ) -> Result<(), GrantError> {
        self.authorize(
            caller,
            resource,
            &Selector::new(SELECTOR_GRANT),
            &management_args(actor, selector),
        )?;

        if let Some(max_index) = predicate.max_index() {
            let arity = self
                .arities
                .read()
                .ok()
                .and_then(|arities| arities.get(selector).copied());
            if let Some(arity) = arity {
                if max_index >= arity {
                    return Err(GrantError::ClauseIndexOutOfRange {
                        selector: selector.clone(),
                        index: max_index,
                        arity,
                    });
                }
            }
        }

        self.store.grant(actor, resource, selector, predicate)?;
        Ok(())
    }

    /// Revoke `selector` on `resource` from `actor`. A no-op when absent.
    pub fn revoke(
        &self,
        caller: &ActorId,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
    ) -> Result<(), GrantError> {
        self.authorize(
            caller,
            resource,
            &Selector::new(SELECTOR_REVOKE),
            &management_args(actor, selector),
        )?;
        self.store.revoke(actor, resource, selector)?;
        Ok(())
    }

    fn is_management_bypass(&self, actor: &ActorId, selector: &Selector) -> bool {
        *actor == self.admin && (selector.0 == SELECTOR_GRANT || selector.0 == SELECTOR_REVOKE)
    }
}

fn management_args(actor: &ActorId, selector: &Selector) -> [ParamValue; 2] {
    [
        ParamValue::Address(actor.0.clone()),
        ParamValue::Bytes(selector.0.as_bytes().to_vec()),
    ]
}
