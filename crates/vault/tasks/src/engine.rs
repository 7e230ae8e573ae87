//! The task base state machine.
//!
//! Every task call runs the same gate sequence:
//!
//! `Idle -> Authorizing -> PreValidating -> Executing -> PostAccounting -> Idle`
//!
//! with an abort back to `Idle` (a returned error) at any gate. The engine
//! coordinates and accounts — the external effect itself happens behind the
//! [`Vault`](crate::vault::Vault) boundary, and ledger mutations for one call
//! commit all-or-nothing after the effect succeeds.

use crate::config::{AcceptanceType, TaskConfig, TaskRole, Threshold};
use crate::error::{ConfigError, PolicyError, TaskError};
use crate::selectors;
use crate::vault::Vault;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;
use vault_connectors::{BalanceConnectorLedger, BalanceUpdate};
use vault_permissions::Authorizer;
use vault_types::{ActorId, ConnectorId, FixedPoint, ParamValue, ResourceId, Selector, TokenId};

/// Phase of a task call, for observability and error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    Authorizing,
    PreValidating,
    Executing,
    PostAccounting,
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallPhase::Idle => "idle",
            CallPhase::Authorizing => "authorizing",
            CallPhase::PreValidating => "pre_validating",
            CallPhase::Executing => "executing",
            CallPhase::PostAccounting => "post_accounting",
        };
        write!(f, "{name}")
    }
}

/// A caller's request: the nominal token and amount plus any extra arguments
/// the task kind wants covered by parameter-scoped permissions.
///
/// `amount == 0` triggers the chaining convention when a previous balance
/// connector is configured.
#[derive(Clone, Debug)]
pub struct CallRequest {
    pub token: TokenId,
    pub amount: u128,
    pub extra_args: Vec<ParamValue>,
}

impl CallRequest {
    pub fn new(token: TokenId, amount: u128) -> Self {
        Self {
            token,
            amount,
            extra_args: vec![],
        }
    }

    pub fn with_extra_args(mut self, args: Vec<ParamValue>) -> Self {
        self.extra_args = args;
        self
    }
}

/// The request after pre-validation: the amount is concrete (chaining
/// resolved) unless the kind allows wildcard amounts.
#[derive(Clone, Debug)]
pub struct ResolvedCall {
    pub trace_id: Uuid,
    pub token: TokenId,
    pub amount: u128,
}

/// What an execution actually produced. The realized token can differ from
/// the consumed one (swaps, bridges).
#[derive(Clone, Debug, PartialEq)]
pub struct Realized {
    pub token: TokenId,
    pub amount: u128,
}

/// Successful call summary returned to the caller.
#[derive(Clone, Debug)]
pub struct CallOutcome {
    pub trace_id: Uuid,
    pub token: TokenId,
    pub consumed: u128,
    pub realized: Realized,
    pub executed_at: DateTime<Utc>,
}

/// A concrete task behavior plugged into the shared lifecycle.
pub trait TaskKind {
    fn selector(&self) -> Selector;

    /// Claim-style operations may run with an unknown (zero) amount.
    fn allows_wildcard_amount(&self) -> bool {
        false
    }

    /// The task-specific effect. Must report a concrete realized amount even
    /// when the nominal request used the zero-amount convention.
    fn execute(
        &self,
        vault: &mut dyn Vault,
        config: &TaskConfig,
        call: &ResolvedCall,
    ) -> Result<Realized, TaskError>;
}

/// Shared per-task state and the call/setter surfaces.
pub struct TaskEngine {
    resource: ResourceId,
    role: TaskRole,
    /// Identity of the smart vault itself; a recipient may never equal it.
    vault_identity: ActorId,
    config: RwLock<TaskConfig>,
    authorizer: Arc<Authorizer>,
    ledger: Arc<BalanceConnectorLedger>,
}

impl TaskEngine {
    pub fn new(
        resource: ResourceId,
        role: TaskRole,
        vault_identity: ActorId,
        authorizer: Arc<Authorizer>,
        ledger: Arc<BalanceConnectorLedger>,
    ) -> Self {
        for (selector, arity) in selectors::SETTER_ARITIES {
            authorizer.register_selector_arity(Selector::new(*selector), *arity);
        }
        Self {
            resource,
            role,
            vault_identity,
            config: RwLock::new(TaskConfig::default()),
            authorizer,
            ledger,
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn role(&self) -> TaskRole {
        self.role
    }

    /// Register the argument count of this task's call selector so grants
    /// against it are bounds-checked eagerly.
    pub fn register_call_arity(&self, selector: Selector, arity: usize) {
        self.authorizer.register_selector_arity(selector, arity);
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Result<TaskConfig, TaskError> {
        Ok(self.read_config()?)
    }

    pub fn max_slippage(&self, token: &TokenId) -> Result<FixedPoint, TaskError> {
        Ok(self.read_config()?.max_slippage_for(token))
    }

    pub fn threshold(&self, token: &TokenId) -> Result<Option<Threshold>, TaskError> {
        Ok(self.read_config()?.threshold_for(token))
    }

    pub fn destination_chain(&self, token: &TokenId) -> Result<Option<u64>, TaskError> {
        Ok(self.read_config()?.destination_chain_for(token))
    }

    // ── Call lifecycle ───────────────────────────────────────────────

    /// Run one task call through the full gate sequence.
    pub fn execute_call(
        &self,
        caller: &ActorId,
        kind: &dyn TaskKind,
        request: CallRequest,
        vault: &mut dyn Vault,
    ) -> Result<CallOutcome, TaskError> {
        let trace_id = Uuid::new_v4();
        let selector = kind.selector();

        debug!(
            trace = %trace_id,
            resource = %self.resource,
            phase = %CallPhase::Authorizing,
            caller = %caller,
            selector = %selector,
            "Task call started"
        );
        let mut args = vec![
            ParamValue::Address(request.token.0.clone()),
            ParamValue::Uint(request.amount),
        ];
        args.extend(request.extra_args.iter().cloned());
        self.authorizer
            .authorize(caller, &self.resource, &selector, &args)?;

        debug!(trace = %trace_id, phase = %CallPhase::PreValidating, "Authorized");
        let config = self.read_config()?;
        let wildcard = kind.allows_wildcard_amount();
        let amount = self.pre_validate(&config, &request, wildcard)?;

        let resolved = ResolvedCall {
            trace_id,
            token: request.token.clone(),
            amount,
        };
        debug!(
            trace = %trace_id,
            phase = %CallPhase::Executing,
            token = %resolved.token,
            amount = resolved.amount,
            "Pre-validation passed"
        );
        let realized = kind.execute(vault, &config, &resolved)?;

        debug!(
            trace = %trace_id,
            phase = %CallPhase::PostAccounting,
            realized_token = %realized.token,
            realized_amount = realized.amount,
            "Execution done"
        );
        let mut updates = Vec::with_capacity(2);
        if let Some(previous) = config.previous_connector {
            updates.push(BalanceUpdate::Decrease {
                connector: previous,
                token: resolved.token.clone(),
                amount: resolved.amount,
            });
        }
        if let Some(next) = config.next_connector {
            updates.push(BalanceUpdate::Increase {
                connector: next,
                token: realized.token.clone(),
                amount: realized.amount,
            });
        }
        self.ledger.apply(&updates)?;

        info!(
            trace = %trace_id,
            resource = %self.resource,
            caller = %caller,
            selector = %selector,
            consumed = resolved.amount,
            realized = realized.amount,
            "Task call completed"
        );
        Ok(CallOutcome {
            trace_id,
            token: resolved.token,
            consumed: resolved.amount,
            realized,
            executed_at: Utc::now(),
        })
    }

    /// The ordered pre-validation gates. Returns the concrete amount after
    /// chaining resolution.
    fn pre_validate(
        &self,
        config: &TaskConfig,
        request: &CallRequest,
        wildcard: bool,
    ) -> Result<u128, TaskError> {
        if request.token.is_zero() {
            return Err(PolicyError::TokenZero.into());
        }

        // Zero-amount chaining: read the amount from the previous connector.
        let mut amount = request.amount;
        if amount == 0 {
            if let Some(previous) = config.previous_connector {
                amount = self.ledger.balance_of(previous, &request.token)?;
            }
        }

        if amount == 0 && !wildcard {
            return Err(PolicyError::AmountZero.into());
        }

        if !config.acceptance.accepts(&request.token) {
            return Err(PolicyError::TokenNotAccepted {
                token: request.token.clone(),
            }
            .into());
        }

        // A wildcard call with an unknown amount cannot be bounded yet.
        if !(wildcard && amount == 0) {
            if let Some(threshold) = config.threshold_for(&request.token) {
                if amount < threshold.min {
                    return Err(PolicyError::BelowThreshold {
                        token: request.token.clone(),
                        amount,
                        min: threshold.min,
                    }
                    .into());
                }
                if threshold.max != 0 && amount > threshold.max {
                    return Err(PolicyError::AboveThreshold {
                        token: request.token.clone(),
                        amount,
                        max: threshold.max,
                    }
                    .into());
                }
            }
        }

        Ok(amount)
    }

    // ── Setters ──────────────────────────────────────────────────────
    //
    // Each setter is independently authorized under its own selector with
    // its arguments, then validates, then mutates. A rejected setter leaves
    // the configuration unchanged.

    pub fn set_connector(&self, caller: &ActorId, connector: ActorId) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_CONNECTOR,
            &[ParamValue::Address(connector.0.clone())],
        )?;
        if connector.is_zero() {
            return Err(ConfigError::ZeroAddress { field: "connector" }.into());
        }

        let mut config = self.write_config()?;
        config.connector = Some(connector.clone());
        info!(resource = %self.resource, connector = %connector, "Connector set");
        Ok(())
    }

    pub fn set_recipient(&self, caller: &ActorId, recipient: ActorId) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_RECIPIENT,
            &[ParamValue::Address(recipient.0.clone())],
        )?;
        if recipient.is_zero() {
            return Err(ConfigError::ZeroAddress { field: "recipient" }.into());
        }
        if recipient == self.vault_identity {
            return Err(ConfigError::RecipientIsVault { recipient }.into());
        }

        let mut config = self.write_config()?;
        config.recipient = Some(recipient.clone());
        info!(resource = %self.resource, recipient = %recipient, "Recipient set");
        Ok(())
    }

    pub fn set_default_destination_chain(
        &self,
        caller: &ActorId,
        chain: u64,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_DEFAULT_DESTINATION_CHAIN,
            &[ParamValue::Uint(chain as u128)],
        )?;
        if chain == 0 {
            return Err(ConfigError::ZeroDestinationChain.into());
        }

        let mut config = self.write_config()?;
        config.default_destination_chain = Some(chain);
        info!(resource = %self.resource, chain, "Default destination chain set");
        Ok(())
    }

    pub fn set_custom_destination_chain(
        &self,
        caller: &ActorId,
        token: TokenId,
        chain: u64,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_CUSTOM_DESTINATION_CHAIN,
            &[
                ParamValue::Address(token.0.clone()),
                ParamValue::Uint(chain as u128),
            ],
        )?;
        if token.is_zero() {
            return Err(ConfigError::ZeroToken {
                context: "custom destination chain",
            }
            .into());
        }
        if chain == 0 {
            return Err(ConfigError::ZeroDestinationChain.into());
        }

        let mut config = self.write_config()?;
        config.custom_destination_chains.insert(token.clone(), chain);
        info!(resource = %self.resource, token = %token, chain, "Custom destination chain set");
        Ok(())
    }

    pub fn set_default_max_slippage(
        &self,
        caller: &ActorId,
        slippage: FixedPoint,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_DEFAULT_MAX_SLIPPAGE,
            &[ParamValue::Uint(slippage.raw() as u128)],
        )?;
        if slippage.is_above_one() {
            return Err(ConfigError::SlippageAboveOne { value: slippage }.into());
        }

        let mut config = self.write_config()?;
        config.default_max_slippage = slippage;
        info!(resource = %self.resource, slippage = %slippage, "Default max slippage set");
        Ok(())
    }

    pub fn set_custom_max_slippage(
        &self,
        caller: &ActorId,
        token: TokenId,
        slippage: FixedPoint,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_CUSTOM_MAX_SLIPPAGE,
            &[
                ParamValue::Address(token.0.clone()),
                ParamValue::Uint(slippage.raw() as u128),
            ],
        )?;
        if token.is_zero() {
            return Err(ConfigError::ZeroToken {
                context: "custom max slippage",
            }
            .into());
        }
        if slippage.is_above_one() {
            return Err(ConfigError::SlippageAboveOne { value: slippage }.into());
        }

        let mut config = self.write_config()?;
        config.custom_max_slippage.insert(token.clone(), slippage);
        info!(resource = %self.resource, token = %token, slippage = %slippage, "Custom max slippage set");
        Ok(())
    }

    pub fn set_balance_connectors(
        &self,
        caller: &ActorId,
        previous: Option<ConnectorId>,
        next: Option<ConnectorId>,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_BALANCE_CONNECTORS,
            &[connector_arg(previous), connector_arg(next)],
        )?;

        if previous.is_some_and(|id| id.is_zero()) || next.is_some_and(|id| id.is_zero()) {
            return Err(ConfigError::ZeroConnectorId.into());
        }
        if let (Some(previous), Some(next)) = (previous, next) {
            if previous == next {
                return Err(ConfigError::ConnectorsNotDistinct.into());
            }
        }
        if previous.is_some() && self.role.forbids_previous() {
            return Err(ConfigError::PreviousConnectorForbidden { role: self.role }.into());
        }
        if next.is_some() && self.role.forbids_next() {
            return Err(ConfigError::NextConnectorForbidden { role: self.role }.into());
        }

        let mut config = self.write_config()?;
        config.previous_connector = previous;
        config.next_connector = next;
        info!(
            resource = %self.resource,
            previous = previous.map(|id| id.to_string()).unwrap_or_default().as_str(),
            next = next.map(|id| id.to_string()).unwrap_or_default().as_str(),
            "Balance connectors set"
        );
        Ok(())
    }

    pub fn set_tokens_acceptance_type(
        &self,
        caller: &ActorId,
        acceptance_type: AcceptanceType,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_TOKENS_ACCEPTANCE_TYPE,
            &[ParamValue::Bool(matches!(
                acceptance_type,
                AcceptanceType::AllowList
            ))],
        )?;

        let mut config = self.write_config()?;
        config.acceptance.acceptance_type = acceptance_type;
        info!(resource = %self.resource, acceptance = ?acceptance_type, "Acceptance type set");
        Ok(())
    }

    pub fn set_tokens_acceptance_list(
        &self,
        caller: &ActorId,
        entries: &[(TokenId, bool)],
    ) -> Result<(), TaskError> {
        let args: Vec<ParamValue> = entries
            .iter()
            .flat_map(|(token, included)| {
                [
                    ParamValue::Address(token.0.clone()),
                    ParamValue::Bool(*included),
                ]
            })
            .collect();
        self.authorize_setter(caller, selectors::SET_TOKENS_ACCEPTANCE_LIST, &args)?;

        if entries.iter().any(|(token, _)| token.is_zero()) {
            return Err(ConfigError::ZeroToken {
                context: "acceptance list",
            }
            .into());
        }

        let mut config = self.write_config()?;
        for (token, included) in entries {
            config.acceptance.set(token.clone(), *included);
        }
        info!(resource = %self.resource, entries = entries.len(), "Acceptance list updated");
        Ok(())
    }

    pub fn set_default_token_threshold(
        &self,
        caller: &ActorId,
        threshold: Threshold,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_DEFAULT_TOKEN_THRESHOLD,
            &[
                ParamValue::Uint(threshold.min),
                ParamValue::Uint(threshold.max),
            ],
        )?;
        threshold.validate()?;

        let mut config = self.write_config()?;
        config.default_threshold = Some(threshold);
        info!(
            resource = %self.resource,
            min = threshold.min,
            max = threshold.max,
            "Default token threshold set"
        );
        Ok(())
    }

    pub fn set_custom_token_threshold(
        &self,
        caller: &ActorId,
        token: TokenId,
        threshold: Threshold,
    ) -> Result<(), TaskError> {
        self.authorize_setter(
            caller,
            selectors::SET_CUSTOM_TOKEN_THRESHOLD,
            &[
                ParamValue::Address(token.0.clone()),
                ParamValue::Uint(threshold.min),
                ParamValue::Uint(threshold.max),
            ],
        )?;
        if token.is_zero() {
            return Err(ConfigError::ZeroToken {
                context: "custom token threshold",
            }
            .into());
        }
        threshold.validate()?;

        let mut config = self.write_config()?;
        config.custom_thresholds.insert(token.clone(), threshold);
        info!(
            resource = %self.resource,
            token = %token,
            min = threshold.min,
            max = threshold.max,
            "Custom token threshold set"
        );
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn authorize_setter(
        &self,
        caller: &ActorId,
        selector: &str,
        args: &[ParamValue],
    ) -> Result<(), TaskError> {
        self.authorizer
            .authorize(caller, &self.resource, &Selector::new(selector), args)?;
        Ok(())
    }

    fn read_config(&self) -> Result<TaskConfig, ConfigError> {
        Ok(self.config.read().map_err(|_| ConfigError::Lock)?.clone())
    }

    fn write_config(&self) -> Result<std::sync::RwLockWriteGuard<'_, TaskConfig>, ConfigError> {
        self.config.write().map_err(|_| ConfigError::Lock)
    }
}

/// Wire encoding of an optional connector id: absent maps to the zero id.
fn connector_arg(id: Option<ConnectorId>) -> ParamValue {
    ParamValue::Bytes(id.unwrap_or(ConnectorId::ZERO).0.to_vec())
}
