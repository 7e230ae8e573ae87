//! Concrete task kinds composed over the shared engine.
//!
//! Each task owns a [`TaskEngine`] and delegates the lifecycle to it; only
//! the `Executing` hook differs. `CollectTask` is a source (it starts a
//! chain), `WithdrawTask` is a sink (it realizes the vault's final output),
//! and `ConnectorTask` is an intermediate pass-through to an external
//! protocol adapter.

use crate::config::{TaskConfig, TaskRole};
use crate::engine::{
    CallOutcome, CallRequest, Realized, ResolvedCall, TaskEngine, TaskKind,
};
use crate::error::{ConfigError, TaskError};
use crate::selectors;
use crate::vault::Vault;
use std::sync::Arc;
use vault_connectors::BalanceConnectorLedger;
use vault_permissions::Authorizer;
use vault_types::{ActorId, ParamValue, ResourceId, Selector, TokenId};

// ── Collect ──────────────────────────────────────────────────────────

struct CollectKind {
    source: ActorId,
}

impl TaskKind for CollectKind {
    fn selector(&self) -> Selector {
        Selector::new(selectors::CALL_COLLECT)
    }

    fn execute(
        &self,
        vault: &mut dyn Vault,
        _config: &TaskConfig,
        call: &ResolvedCall,
    ) -> Result<Realized, TaskError> {
        let amount = vault.collect(&call.token, &self.source, call.amount)?;
        Ok(Realized {
            token: call.token.clone(),
            amount,
        })
    }
}

/// Pulls funds from a configured source into the vault. Source role: it may
/// feed a next connector but never consumes a previous one.
pub struct CollectTask {
    engine: TaskEngine,
    source: ActorId,
}

impl CollectTask {
    pub fn new(
        resource: ResourceId,
        vault_identity: ActorId,
        authorizer: Arc<Authorizer>,
        ledger: Arc<BalanceConnectorLedger>,
        source: ActorId,
    ) -> Result<Self, TaskError> {
        if source.is_zero() {
            return Err(ConfigError::ZeroAddress { field: "source" }.into());
        }
        let engine = TaskEngine::new(
            resource,
            TaskRole::Source,
            vault_identity,
            authorizer,
            ledger,
        );
        // token, amount, source
        engine.register_call_arity(Selector::new(selectors::CALL_COLLECT), 3);
        Ok(Self { engine, source })
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn call(
        &self,
        caller: &ActorId,
        token: TokenId,
        amount: u128,
        vault: &mut dyn Vault,
    ) -> Result<CallOutcome, TaskError> {
        let kind = CollectKind {
            source: self.source.clone(),
        };
        let request = CallRequest::new(token, amount)
            .with_extra_args(vec![ParamValue::Address(self.source.0.clone())]);
        self.engine.execute_call(caller, &kind, request, vault)
    }
}

// ── Withdraw ─────────────────────────────────────────────────────────

struct WithdrawKind;

impl TaskKind for WithdrawKind {
    fn selector(&self) -> Selector {
        Selector::new(selectors::CALL_WITHDRAW)
    }

    fn execute(
        &self,
        vault: &mut dyn Vault,
        config: &TaskConfig,
        call: &ResolvedCall,
    ) -> Result<Realized, TaskError> {
        let recipient = config
            .recipient
            .clone()
            .ok_or(ConfigError::RecipientNotSet)?;
        let amount = vault.withdraw(&call.token, &recipient, call.amount)?;
        Ok(Realized {
            token: call.token.clone(),
            amount,
        })
    }
}

/// Sends vault funds to the configured recipient. Sink role: it may consume
/// a previous connector but never feeds a next one.
pub struct WithdrawTask {
    engine: TaskEngine,
}

impl WithdrawTask {
    pub fn new(
        resource: ResourceId,
        vault_identity: ActorId,
        authorizer: Arc<Authorizer>,
        ledger: Arc<BalanceConnectorLedger>,
    ) -> Self {
        let engine = TaskEngine::new(
            resource,
            TaskRole::Sink,
            vault_identity,
            authorizer,
            ledger,
        );
        // token, amount
        engine.register_call_arity(Selector::new(selectors::CALL_WITHDRAW), 2);
        Self { engine }
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn call(
        &self,
        caller: &ActorId,
        token: TokenId,
        amount: u128,
        vault: &mut dyn Vault,
    ) -> Result<CallOutcome, TaskError> {
        self.engine
            .execute_call(caller, &WithdrawKind, CallRequest::new(token, amount), vault)
    }
}

// ── Connector execution ──────────────────────────────────────────────

struct ExecuteKind {
    data: Vec<u8>,
    out_token: Option<TokenId>,
    claim: bool,
}

impl TaskKind for ExecuteKind {
    fn selector(&self) -> Selector {
        Selector::new(selectors::CALL_EXECUTE)
    }

    fn allows_wildcard_amount(&self) -> bool {
        self.claim
    }

    fn execute(
        &self,
        vault: &mut dyn Vault,
        config: &TaskConfig,
        call: &ResolvedCall,
    ) -> Result<Realized, TaskError> {
        let connector = config.connector.clone().ok_or(ConfigError::ConnectorNotSet)?;
        let amount = vault.execute(&connector, &self.data)?;
        Ok(Realized {
            token: self.out_token.clone().unwrap_or_else(|| call.token.clone()),
            amount,
        })
    }
}

/// Passes an opaque encoded call through to the configured external adapter
/// (swap, bridge, claim). Intermediate role: both connectors allowed.
pub struct ConnectorTask {
    engine: TaskEngine,
}

impl ConnectorTask {
    pub fn new(
        resource: ResourceId,
        vault_identity: ActorId,
        authorizer: Arc<Authorizer>,
        ledger: Arc<BalanceConnectorLedger>,
    ) -> Self {
        let engine = TaskEngine::new(
            resource,
            TaskRole::Intermediate,
            vault_identity,
            authorizer,
            ledger,
        );
        Self { engine }
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    /// Execute against the adapter with a known input amount. `out_token`
    /// names the produced token when it differs from the consumed one.
    pub fn call(
        &self,
        caller: &ActorId,
        token: TokenId,
        amount: u128,
        out_token: Option<TokenId>,
        data: Vec<u8>,
        vault: &mut dyn Vault,
    ) -> Result<CallOutcome, TaskError> {
        let kind = ExecuteKind {
            data,
            out_token,
            claim: false,
        };
        self.engine
            .execute_call(caller, &kind, CallRequest::new(token, amount), vault)
    }

    /// Claim-style execution: the output is unknown ahead of time, so a zero
    /// amount is allowed and the realized amount comes from the adapter.
    pub fn claim(
        &self,
        caller: &ActorId,
        token: TokenId,
        data: Vec<u8>,
        vault: &mut dyn Vault,
    ) -> Result<CallOutcome, TaskError> {
        let kind = ExecuteKind {
            data,
            out_token: None,
            claim: true,
        };
        self.engine
            .execute_call(caller, &kind, CallRequest::new(token, 0), vault)
    }
}
