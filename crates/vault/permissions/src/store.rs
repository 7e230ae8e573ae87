//! The permission store: per-(actor, resource) selector sets and predicates.

use crate::predicate::Predicate;
use crate::set::EnumerableSelectorSet;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};
use vault_types::{ActorId, ResourceId, Selector};

/// Permissions held by one actor over one resource.
#[derive(Clone, Debug, Default)]
struct ActorPermissions {
    selectors: EnumerableSelectorSet,
    predicates: HashMap<Selector, Predicate>,
}

/// Storage-level errors. Authorization decisions never originate here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission store lock poisoned")]
    Lock,
}

/// Process-wide permission state, mutated only through the authorizer layer.
///
/// A permission exists iff its selector is present in the per-actor set;
/// revoking the last selector for an (actor, resource) pair drops the whole
/// entry so no dangling empty sets remain.
#[derive(Debug, Default)]
pub struct PermissionStore {
    grants: RwLock<HashMap<(ActorId, ResourceId), ActorPermissions>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `selector` on `resource` to `actor`, overwriting any stored
    /// predicate. Idempotent on selector presence.
    pub fn grant(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
        predicate: Predicate,
    ) -> Result<(), StoreError> {
        let mut grants = self.grants.write().map_err(|_| StoreError::Lock)?;
        let entry = grants
            .entry((actor.clone(), resource.clone()))
            .or_default();

        let inserted = entry.selectors.insert(selector.clone());
        entry.predicates.insert(selector.clone(), predicate);

        info!(
            actor = %actor,
            resource = %resource,
            selector = %selector,
            new = inserted,
            "Permission granted"
        );
        Ok(())
    }

    /// Revoke `selector` on `resource` from `actor`. A no-op when absent.
    pub fn revoke(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
    ) -> Result<(), StoreError> {
        let mut grants = self.grants.write().map_err(|_| StoreError::Lock)?;
        let key = (actor.clone(), resource.clone());

        let Some(entry) = grants.get_mut(&key) else {
            return Ok(());
        };

        if entry.selectors.remove(selector) {
            entry.predicates.remove(selector);
            info!(
                actor = %actor,
                resource = %resource,
                selector = %selector,
                "Permission revoked"
            );
        }

        if entry.selectors.is_empty() {
            grants.remove(&key);
            debug!(actor = %actor, resource = %resource, "Last permission removed, entry dropped");
        }
        Ok(())
    }

    pub fn has_permission(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
    ) -> Result<bool, StoreError> {
        let grants = self.grants.read().map_err(|_| StoreError::Lock)?;
        Ok(grants
            .get(&(actor.clone(), resource.clone()))
            .is_some_and(|entry| entry.selectors.contains(selector)))
    }

    pub fn has_any_permission(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
    ) -> Result<bool, StoreError> {
        let grants = self.grants.read().map_err(|_| StoreError::Lock)?;
        Ok(grants.contains_key(&(actor.clone(), resource.clone())))
    }

    pub fn permission_count(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
    ) -> Result<usize, StoreError> {
        let grants = self.grants.read().map_err(|_| StoreError::Lock)?;
        Ok(grants
            .get(&(actor.clone(), resource.clone()))
            .map_or(0, |entry| entry.selectors.len()))
    }

    /// Stored predicate for a selector, if the permission exists.
    pub fn predicate(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
        selector: &Selector,
    ) -> Result<Option<Predicate>, StoreError> {
        let grants = self.grants.read().map_err(|_| StoreError::Lock)?;
        Ok(grants
            .get(&(actor.clone(), resource.clone()))
            .and_then(|entry| entry.predicates.get(selector).cloned()))
    }
}
