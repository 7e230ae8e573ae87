//! Per-task configuration: token acceptance, thresholds, connector wiring,
//! and slippage/destination defaults with per-token overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vault_types::{ActorId, ConnectorId, FixedPoint, TokenId};

/// Architectural role of a task, fixed at construction.
///
/// Sources produce the first amount of a chain and cannot consume a previous
/// connector; sinks realize the vault's final output and cannot feed a next
/// connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRole {
    Source,
    Sink,
    Intermediate,
}

impl TaskRole {
    pub fn forbids_previous(&self) -> bool {
        matches!(self, TaskRole::Source)
    }

    pub fn forbids_next(&self) -> bool {
        matches!(self, TaskRole::Sink)
    }
}

impl std::fmt::Display for TaskRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskRole::Source => "source",
            TaskRole::Sink => "sink",
            TaskRole::Intermediate => "intermediate",
        };
        write!(f, "{name}")
    }
}

/// Whether the acceptance set is an allow-list or a deny-list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceType {
    AllowList,
    DenyList,
}

/// Token acceptance policy. The default is an empty deny-list, which accepts
/// every token until the admin narrows it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub acceptance_type: AcceptanceType,
    tokens: HashSet<TokenId>,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            acceptance_type: AcceptanceType::DenyList,
            tokens: HashSet::new(),
        }
    }
}

impl AcceptancePolicy {
    pub fn accepts(&self, token: &TokenId) -> bool {
        match self.acceptance_type {
            AcceptanceType::AllowList => self.tokens.contains(token),
            AcceptanceType::DenyList => !self.tokens.contains(token),
        }
    }

    /// Add or remove a token from the acceptance set.
    pub fn set(&mut self, token: TokenId, included: bool) {
        if included {
            self.tokens.insert(token);
        } else {
            self.tokens.remove(&token);
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.tokens.iter()
    }
}

/// Per-token amount bounds. `max == 0` means "no upper bound".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub min: u128,
    pub max: u128,
}

impl Threshold {
    pub fn new(min: u128, max: u128) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max != 0 && self.min > self.max {
            return Err(ConfigError::InvalidThreshold {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn allows(&self, amount: u128) -> bool {
        amount >= self.min && (self.max == 0 || amount <= self.max)
    }
}

/// The full mutable configuration of one task.
///
/// Connector wiring uses `Option` rather than the zero-id sentinel: absent
/// means disabled, and a present id is always concrete and non-zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    pub acceptance: AcceptancePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_threshold: Option<Threshold>,
    pub custom_thresholds: HashMap<TokenId, Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_connector: Option<ConnectorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_connector: Option<ConnectorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ActorId>,
    /// Address of the external protocol adapter this task executes through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_destination_chain: Option<u64>,
    pub custom_destination_chains: HashMap<TokenId, u64>,
    pub default_max_slippage: FixedPoint,
    pub custom_max_slippage: HashMap<TokenId, FixedPoint>,
}

impl TaskConfig {
    /// Applicable threshold for a token: custom first, then default.
    pub fn threshold_for(&self, token: &TokenId) -> Option<Threshold> {
        self.custom_thresholds
            .get(token)
            .copied()
            .or(self.default_threshold)
    }

    /// Applicable max slippage for a token: custom first, then default.
    pub fn max_slippage_for(&self, token: &TokenId) -> FixedPoint {
        self.custom_max_slippage
            .get(token)
            .copied()
            .unwrap_or(self.default_max_slippage)
    }

    /// Applicable destination chain for a token: custom first, then default.
    pub fn destination_chain_for(&self, token: &TokenId) -> Option<u64> {
        self.custom_destination_chains
            .get(token)
            .copied()
            .or(self.default_destination_chain)
    }
}
