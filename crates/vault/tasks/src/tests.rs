//! End-to-end behavior of the task lifecycle against a mock vault.

use crate::config::{AcceptanceType, TaskRole, Threshold};
use crate::engine::TaskEngine;
use crate::error::{ConfigError, PolicyError, TaskError, VaultError};
use crate::tasks::{CollectTask, ConnectorTask, WithdrawTask};
use crate::vault::Vault;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use vault_connectors::{BalanceConnectorLedger, LedgerError};
use vault_permissions::{
    AuthorizationError, Authorizer, ParamClause, ParamOp, Predicate,
};
use vault_types::{ActorId, ConnectorId, FixedPoint, ParamValue, ResourceId, Selector, TokenId};

// ── Mock vault ───────────────────────────────────────────────────────

struct MockVault {
    vault_balances: HashMap<TokenId, u128>,
    holder_balances: HashMap<(ActorId, TokenId), u128>,
    /// Realized output reported by `execute`; `None` makes the adapter fail.
    exec_output: Option<u128>,
    exec_calls: Vec<(ActorId, Vec<u8>)>,
}

impl MockVault {
    fn new() -> Self {
        Self {
            vault_balances: HashMap::new(),
            holder_balances: HashMap::new(),
            exec_output: Some(0),
            exec_calls: vec![],
        }
    }

    fn fund_holder(&mut self, holder: &ActorId, token: &TokenId, amount: u128) {
        *self
            .holder_balances
            .entry((holder.clone(), token.clone()))
            .or_insert(0) += amount;
    }

    fn fund_vault(&mut self, token: &TokenId, amount: u128) {
        *self.vault_balances.entry(token.clone()).or_insert(0) += amount;
    }

    fn vault_balance(&self, token: &TokenId) -> u128 {
        self.vault_balances.get(token).copied().unwrap_or(0)
    }

    fn holder_balance(&self, holder: &ActorId, token: &TokenId) -> u128 {
        self.holder_balances
            .get(&(holder.clone(), token.clone()))
            .copied()
            .unwrap_or(0)
    }
}

impl Vault for MockVault {
    fn collect(
        &mut self,
        token: &TokenId,
        from: &ActorId,
        amount: u128,
    ) -> Result<u128, VaultError> {
        let key = (from.clone(), token.clone());
        let held = self.holder_balances.get(&key).copied().unwrap_or(0);
        if held < amount {
            return Err(VaultError::new("collect", "insufficient source balance"));
        }
        self.holder_balances.insert(key, held - amount);
        *self.vault_balances.entry(token.clone()).or_insert(0) += amount;
        Ok(amount)
    }

    fn withdraw(
        &mut self,
        token: &TokenId,
        recipient: &ActorId,
        amount: u128,
    ) -> Result<u128, VaultError> {
        let held = self.vault_balances.get(token).copied().unwrap_or(0);
        if held < amount {
            return Err(VaultError::new("withdraw", "insufficient vault balance"));
        }
        self.vault_balances.insert(token.clone(), held - amount);
        *self
            .holder_balances
            .entry((recipient.clone(), token.clone()))
            .or_insert(0) += amount;
        Ok(amount)
    }

    fn execute(&mut self, connector: &ActorId, data: &[u8]) -> Result<u128, VaultError> {
        self.exec_calls.push((connector.clone(), data.to_vec()));
        self.exec_output
            .ok_or_else(|| VaultError::new("execute", "connector reverted"))
    }
}

// ── Fixture ──────────────────────────────────────────────────────────

fn admin() -> ActorId {
    ActorId::new("owner")
}

fn keeper() -> ActorId {
    ActorId::new("keeper")
}

fn ops() -> ActorId {
    ActorId::new("ops")
}

fn vault_identity() -> ActorId {
    ActorId::new("smart-vault")
}

fn dai() -> TokenId {
    TokenId::new("DAI")
}

fn usdc() -> TokenId {
    TokenId::new("USDC")
}

fn stack() -> (Arc<Authorizer>, Arc<BalanceConnectorLedger>) {
    (
        Arc::new(Authorizer::new(admin())),
        Arc::new(BalanceConnectorLedger::new()),
    )
}

fn grant(authorizer: &Authorizer, actor: &ActorId, resource: &ResourceId, selector: &str) {
    authorizer
        .grant(
            &admin(),
            actor,
            resource,
            &Selector::new(selector),
            Predicate::unconditional(),
        )
        .unwrap();
}

fn grant_setters(authorizer: &Authorizer, resource: &ResourceId) {
    for (selector, _) in crate::selectors::SETTER_ARITIES {
        grant(authorizer, &ops(), resource, selector);
    }
    grant(
        authorizer,
        &ops(),
        resource,
        crate::selectors::SET_TOKENS_ACCEPTANCE_LIST,
    );
}

fn collect_task(authorizer: &Arc<Authorizer>, ledger: &Arc<BalanceConnectorLedger>) -> CollectTask {
    let resource = ResourceId::new("task-collect");
    let task = CollectTask::new(
        resource.clone(),
        vault_identity(),
        Arc::clone(authorizer),
        Arc::clone(ledger),
        ActorId::new("treasury"),
    )
    .unwrap();
    grant(authorizer, &keeper(), &resource, crate::selectors::CALL_COLLECT);
    grant_setters(authorizer, &resource);
    task
}

fn withdraw_task(
    authorizer: &Arc<Authorizer>,
    ledger: &Arc<BalanceConnectorLedger>,
) -> WithdrawTask {
    let resource = ResourceId::new("task-withdraw");
    let task = WithdrawTask::new(
        resource.clone(),
        vault_identity(),
        Arc::clone(authorizer),
        Arc::clone(ledger),
    );
    grant(authorizer, &keeper(), &resource, crate::selectors::CALL_WITHDRAW);
    grant_setters(authorizer, &resource);
    task
}

fn connector_task(
    authorizer: &Arc<Authorizer>,
    ledger: &Arc<BalanceConnectorLedger>,
) -> ConnectorTask {
    let resource = ResourceId::new("task-swap");
    let task = ConnectorTask::new(
        resource.clone(),
        vault_identity(),
        Arc::clone(authorizer),
        Arc::clone(ledger),
    );
    grant(authorizer, &keeper(), &resource, crate::selectors::CALL_EXECUTE);
    grant_setters(authorizer, &resource);
    task
}

// ── Authorization gate ───────────────────────────────────────────────

#[test]
fn unauthorized_caller_is_denied_regardless_of_arguments() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    let stranger = ActorId::new("stranger");

    let result = task.call(&stranger, dai(), 100, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Authorization(AuthorizationError::NotAllowed { .. }))
    ));

    // Setters deny the same way, even with perfectly valid arguments.
    let result = task
        .engine()
        .set_default_token_threshold(&stranger, Threshold::new(1, 0));
    assert!(matches!(
        result,
        Err(TaskError::Authorization(AuthorizationError::NotAllowed { .. }))
    ));
}

#[test]
fn predicate_scoped_call_permission_bounds_the_amount() {
    let (authorizer, ledger) = stack();
    let resource = ResourceId::new("task-collect");
    let task = CollectTask::new(
        resource.clone(),
        vault_identity(),
        Arc::clone(&authorizer),
        Arc::clone(&ledger),
        ActorId::new("treasury"),
    )
    .unwrap();

    // keeper may collect at most 1000 units per call (arg index 1 = amount).
    authorizer
        .grant(
            &admin(),
            &keeper(),
            &resource,
            &Selector::new(crate::selectors::CALL_COLLECT),
            Predicate::with_clauses(vec![ParamClause::new(
                1,
                ParamOp::Lte(ParamValue::Uint(1_000)),
            )]),
        )
        .unwrap();

    let mut vault = MockVault::new();
    vault.fund_holder(&ActorId::new("treasury"), &dai(), 10_000);

    let result = task.call(&keeper(), dai(), 1_001, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Authorization(
            AuthorizationError::PredicateRejected { .. }
        ))
    ));

    task.call(&keeper(), dai(), 1_000, &mut vault).unwrap();
    assert_eq!(vault.vault_balance(&dai()), 1_000);
}

// ── Pre-validation gates ─────────────────────────────────────────────

#[test]
fn zero_amount_without_chaining_is_a_policy_violation() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();

    let result = task.call(&keeper(), dai(), 0, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Policy(PolicyError::AmountZero))
    ));
}

#[test]
fn threshold_min_gates_the_call() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    vault.fund_holder(&ActorId::new("treasury"), &dai(), 1_000);

    task.engine()
        .set_default_token_threshold(&ops(), Threshold::new(10, 0))
        .unwrap();

    let result = task.call(&keeper(), dai(), 9, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Policy(PolicyError::BelowThreshold {
            amount: 9,
            min: 10,
            ..
        }))
    ));

    task.call(&keeper(), dai(), 10, &mut vault).unwrap();
    assert_eq!(vault.vault_balance(&dai()), 10);
}

#[test]
fn custom_threshold_max_overrides_default() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    vault.fund_holder(&ActorId::new("treasury"), &dai(), 1_000);

    task.engine()
        .set_default_token_threshold(&ops(), Threshold::new(1, 0))
        .unwrap();
    task.engine()
        .set_custom_token_threshold(&ops(), dai(), Threshold::new(1, 20))
        .unwrap();

    let result = task.call(&keeper(), dai(), 21, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Policy(PolicyError::AboveThreshold {
            amount: 21,
            max: 20,
            ..
        }))
    ));
    task.call(&keeper(), dai(), 20, &mut vault).unwrap();
}

#[test]
fn allow_list_acceptance_rejects_unlisted_tokens() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    vault.fund_holder(&ActorId::new("treasury"), &dai(), 1_000);
    vault.fund_holder(&ActorId::new("treasury"), &usdc(), 1_000);

    task.engine()
        .set_tokens_acceptance_type(&ops(), AcceptanceType::AllowList)
        .unwrap();
    task.engine()
        .set_tokens_acceptance_list(&ops(), &[(dai(), true)])
        .unwrap();

    let result = task.call(&keeper(), usdc(), 100, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Policy(PolicyError::TokenNotAccepted { .. }))
    ));
    task.call(&keeper(), dai(), 100, &mut vault).unwrap();
}

#[test]
fn deny_list_acceptance_rejects_listed_tokens() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    vault.fund_holder(&ActorId::new("treasury"), &dai(), 1_000);

    task.engine()
        .set_tokens_acceptance_list(&ops(), &[(dai(), true)])
        .unwrap();

    let result = task.call(&keeper(), dai(), 100, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Policy(PolicyError::TokenNotAccepted { .. }))
    ));
}

// ── Chaining and accounting ──────────────────────────────────────────

#[test]
fn zero_amount_call_resolves_from_previous_connector_and_drains_it() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let previous = ConnectorId::from_label("collect-out");
    let next = ConnectorId::from_label("swap-out");

    task.engine()
        .set_connector(&ops(), ActorId::new("dex-adapter"))
        .unwrap();
    task.engine()
        .set_balance_connectors(&ops(), Some(previous), Some(next))
        .unwrap();
    ledger.increase(previous, &dai(), 100).unwrap();

    let mut vault = MockVault::new();
    vault.exec_output = Some(95);

    let outcome = task
        .call(&keeper(), dai(), 0, Some(usdc()), b"swap".to_vec(), &mut vault)
        .unwrap();

    assert_eq!(outcome.consumed, 100);
    assert_eq!(outcome.realized.token, usdc());
    assert_eq!(outcome.realized.amount, 95);
    assert_eq!(ledger.balance_of(previous, &dai()).unwrap(), 0);
    assert_eq!(ledger.balance_of(next, &usdc()).unwrap(), 95);
    assert_eq!(
        vault.exec_calls,
        vec![(ActorId::new("dex-adapter"), b"swap".to_vec())]
    );
}

#[test]
fn failed_execution_leaves_the_ledger_unchanged() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let previous = ConnectorId::from_label("collect-out");
    let next = ConnectorId::from_label("swap-out");

    task.engine()
        .set_connector(&ops(), ActorId::new("dex-adapter"))
        .unwrap();
    task.engine()
        .set_balance_connectors(&ops(), Some(previous), Some(next))
        .unwrap();
    ledger.increase(previous, &dai(), 100).unwrap();

    let mut vault = MockVault::new();
    vault.exec_output = None; // adapter reverts

    let result = task.call(&keeper(), dai(), 0, None, b"swap".to_vec(), &mut vault);
    assert!(matches!(result, Err(TaskError::External(_))));
    assert_eq!(ledger.balance_of(previous, &dai()).unwrap(), 100);
    assert_eq!(ledger.balance_of(next, &dai()).unwrap(), 0);
}

#[test]
fn overdrawing_the_previous_connector_is_an_accounting_error() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let previous = ConnectorId::from_label("collect-out");
    let next = ConnectorId::from_label("swap-out");

    task.engine()
        .set_connector(&ops(), ActorId::new("dex-adapter"))
        .unwrap();
    task.engine()
        .set_balance_connectors(&ops(), Some(previous), Some(next))
        .unwrap();
    ledger.increase(previous, &dai(), 50).unwrap();

    let mut vault = MockVault::new();
    vault.exec_output = Some(90);

    // Explicit amount above what the chain actually produced: the wiring is
    // wrong and the whole accounting batch must roll back.
    let result = task.call(&keeper(), dai(), 100, None, b"swap".to_vec(), &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Accounting(
            LedgerError::InsufficientTrackedBalance { .. }
        ))
    ));
    assert_eq!(ledger.balance_of(previous, &dai()).unwrap(), 50);
    assert_eq!(ledger.balance_of(next, &dai()).unwrap(), 0);
}

#[test]
fn claim_allows_unknown_amount_and_credits_realized_output() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let next = ConnectorId::from_label("claim-out");

    task.engine()
        .set_connector(&ops(), ActorId::new("rewards-adapter"))
        .unwrap();
    task.engine()
        .set_balance_connectors(&ops(), None, Some(next))
        .unwrap();

    let mut vault = MockVault::new();
    vault.exec_output = Some(77);

    let outcome = task
        .claim(&keeper(), dai(), b"claim".to_vec(), &mut vault)
        .unwrap();
    assert_eq!(outcome.consumed, 0);
    assert_eq!(outcome.realized.amount, 77);
    assert_eq!(ledger.balance_of(next, &dai()).unwrap(), 77);
}

#[test]
fn execute_without_configured_adapter_is_a_config_error() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let mut vault = MockVault::new();

    let result = task.call(&keeper(), dai(), 100, None, vec![], &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::ConnectorNotSet))
    ));
}

#[test]
fn withdraw_consumes_a_chained_amount_to_the_recipient() {
    let (authorizer, ledger) = stack();
    let task = withdraw_task(&authorizer, &ledger);
    let previous = ConnectorId::from_label("swap-out");
    let recipient = ActorId::new("payroll");

    task.engine().set_recipient(&ops(), recipient.clone()).unwrap();
    task.engine()
        .set_balance_connectors(&ops(), Some(previous), None)
        .unwrap();
    ledger.increase(previous, &dai(), 100).unwrap();

    let mut vault = MockVault::new();
    vault.fund_vault(&dai(), 100);

    let outcome = task.call(&keeper(), dai(), 0, &mut vault).unwrap();
    assert_eq!(outcome.consumed, 100);
    assert_eq!(vault.holder_balance(&recipient, &dai()), 100);
    assert_eq!(ledger.balance_of(previous, &dai()).unwrap(), 0);
}

#[test]
fn withdraw_without_recipient_is_a_config_error() {
    let (authorizer, ledger) = stack();
    let task = withdraw_task(&authorizer, &ledger);
    let mut vault = MockVault::new();
    vault.fund_vault(&dai(), 100);

    let result = task.call(&keeper(), dai(), 100, &mut vault);
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::RecipientNotSet))
    ));
}

// ── Connector wiring rules ───────────────────────────────────────────

#[test]
fn sink_tasks_forbid_a_next_connector() {
    let (authorizer, ledger) = stack();
    let task = withdraw_task(&authorizer, &ledger);

    let result = task.engine().set_balance_connectors(
        &ops(),
        Some(ConnectorId::from_label("in")),
        Some(ConnectorId::from_label("out")),
    );
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::NextConnectorForbidden {
            role: TaskRole::Sink
        }))
    ));
}

#[test]
fn source_tasks_forbid_a_previous_connector() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);

    let result = task.engine().set_balance_connectors(
        &ops(),
        Some(ConnectorId::from_label("in")),
        None,
    );
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::PreviousConnectorForbidden {
            role: TaskRole::Source
        }))
    ));

    // The next side is fine for a source.
    task.engine()
        .set_balance_connectors(&ops(), None, Some(ConnectorId::from_label("out")))
        .unwrap();
}

#[test]
fn connector_wiring_rejects_zero_and_duplicate_ids() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);
    let id = ConnectorId::from_label("both");

    let result = task
        .engine()
        .set_balance_connectors(&ops(), Some(ConnectorId::ZERO), None);
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::ZeroConnectorId))
    ));

    let result = task
        .engine()
        .set_balance_connectors(&ops(), Some(id), Some(id));
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::ConnectorsNotDistinct))
    ));
}

// ── Setter validation ────────────────────────────────────────────────

#[test]
fn custom_max_slippage_bounds_and_readback() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);

    let above_one = FixedPoint::from_raw(FixedPoint::ONE.raw() + FixedPoint::ONE.raw() / 2);
    let result = task
        .engine()
        .set_custom_max_slippage(&ops(), dai(), above_one);
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::SlippageAboveOne { .. }))
    ));
    // The rejected setter must not have changed anything.
    assert_eq!(
        task.engine().max_slippage(&dai()).unwrap(),
        FixedPoint::ZERO
    );

    task.engine()
        .set_custom_max_slippage(&ops(), dai(), FixedPoint::ONE)
        .unwrap();
    assert_eq!(task.engine().max_slippage(&dai()).unwrap(), FixedPoint::ONE);
    // Other tokens still resolve through the default.
    assert_eq!(
        task.engine().max_slippage(&usdc()).unwrap(),
        FixedPoint::ZERO
    );
}

#[test]
fn recipient_setter_rejects_zero_and_the_vault_itself() {
    let (authorizer, ledger) = stack();
    let task = withdraw_task(&authorizer, &ledger);

    let result = task.engine().set_recipient(&ops(), ActorId::new(""));
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::ZeroAddress {
            field: "recipient"
        }))
    ));

    let result = task.engine().set_recipient(&ops(), vault_identity());
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::RecipientIsVault { .. }))
    ));
}

#[test]
fn destination_chain_setters_validate_and_resolve_custom_over_default() {
    let (authorizer, ledger) = stack();
    let task = connector_task(&authorizer, &ledger);

    let result = task.engine().set_default_destination_chain(&ops(), 0);
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::ZeroDestinationChain))
    ));

    task.engine().set_default_destination_chain(&ops(), 1).unwrap();
    task.engine()
        .set_custom_destination_chain(&ops(), dai(), 10)
        .unwrap();
    assert_eq!(task.engine().destination_chain(&dai()).unwrap(), Some(10));
    assert_eq!(task.engine().destination_chain(&usdc()).unwrap(), Some(1));
}

#[test]
fn invalid_threshold_is_rejected_with_state_unchanged() {
    let (authorizer, ledger) = stack();
    let task = collect_task(&authorizer, &ledger);

    let result = task
        .engine()
        .set_default_token_threshold(&ops(), Threshold::new(30, 20));
    assert!(matches!(
        result,
        Err(TaskError::Config(ConfigError::InvalidThreshold { .. }))
    ));
    assert_eq!(task.engine().threshold(&dai()).unwrap(), None);
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    /// The call-time threshold gate agrees with `Threshold::allows` for any
    /// bounds and any positive amount.
    #[test]
    fn property_threshold_gate_matches_allows(
        min in 0u128..1_000,
        max in 0u128..1_000,
        amount in 1u128..1_500,
    ) {
        prop_assume!(max == 0 || min <= max);
        let threshold = Threshold::new(min, max);

        let (authorizer, ledger) = stack();
        let task = collect_task(&authorizer, &ledger);
        task.engine()
            .set_default_token_threshold(&ops(), threshold)
            .unwrap();

        let mut vault = MockVault::new();
        vault.fund_holder(&ActorId::new("treasury"), &dai(), amount);

        let result = task.call(&keeper(), dai(), amount, &mut vault);
        prop_assert_eq!(result.is_ok(), threshold.allows(amount));
    }
}

// ── Engine surface ───────────────────────────────────────────────────

#[test]
fn engine_exposes_resource_and_role() {
    let (authorizer, ledger) = stack();
    let resource = ResourceId::new("task-generic");
    let engine = TaskEngine::new(
        resource.clone(),
        TaskRole::Intermediate,
        vault_identity(),
        authorizer,
        ledger,
    );
    assert_eq!(engine.resource(), &resource);
    assert_eq!(engine.role(), TaskRole::Intermediate);
}
