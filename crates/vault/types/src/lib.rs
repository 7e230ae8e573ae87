//! Vault Types - shared identifiers and values for the smart-vault task core.
//!
//! Every other vault crate builds on these: actors and tokens are string
//! identities, balance connectors are 32-byte ids, and operation arguments
//! are `ParamValue`s with explicitly checked comparison semantics.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// An identity attempting an operation (caller address, bot, relayer).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Empty identities stand in for the zero address and are never valid.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token handled by the vault.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The zero token — forbidden everywhere a concrete token is required.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The module instance being acted upon — here, a task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a specific operation on a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(pub String);

impl Selector {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-byte balance connector id.
///
/// The all-zero id exists for wire compatibility with external callers but is
/// never accepted where a concrete connector is required; configuration
/// models "no connector" as `Option<ConnectorId>` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorId(pub [u8; 32]);

impl ConnectorId {
    pub const ZERO: ConnectorId = ConnectorId([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an id from a human-readable label (bytes copied left-aligned,
    /// truncated at 32). Distinct labels under 32 bytes map to distinct ids.
    pub fn from_label(label: &str) -> Self {
        let mut bytes = [0u8; 32];
        for (slot, byte) in bytes.iter_mut().zip(label.as_bytes()) {
            *slot = *byte;
        }
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl std::fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A single positional argument of an operation call.
///
/// Ordered comparison is defined only between numeric values; cross-signedness
/// comparison is explicit and never wraps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Uint(u128),
    Int(i128),
    Address(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

impl ParamValue {
    /// Compare two values numerically. Returns an error for non-numeric
    /// operands so callers can surface a denial instead of panicking.
    pub fn compare(&self, other: &ParamValue) -> Result<Ordering, ValueError> {
        match (self, other) {
            (ParamValue::Uint(a), ParamValue::Uint(b)) => Ok(a.cmp(b)),
            (ParamValue::Int(a), ParamValue::Int(b)) => Ok(a.cmp(b)),
            (ParamValue::Uint(a), ParamValue::Int(b)) => Ok(cmp_uint_int(*a, *b)),
            (ParamValue::Int(a), ParamValue::Uint(b)) => Ok(cmp_uint_int(*b, *a).reverse()),
            (lhs, rhs) => Err(ValueError::NotComparable {
                lhs: lhs.kind(),
                rhs: rhs.kind(),
            }),
        }
    }

    /// Short name of the variant, used in error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Uint(_) => "uint",
            ParamValue::Int(_) => "int",
            ParamValue::Address(_) => "address",
            ParamValue::Bytes(_) => "bytes",
            ParamValue::Bool(_) => "bool",
        }
    }
}

/// Unsigned/signed comparison without conversion loss: a negative signed
/// value is always below any unsigned value, otherwise magnitudes compare.
fn cmp_uint_int(uint: u128, int: i128) -> Ordering {
    if int < 0 {
        Ordering::Greater
    } else {
        uint.cmp(&(int as u128))
    }
}

/// Value-level errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("values of kind {lhs} and {rhs} are not comparable")]
    NotComparable {
        lhs: &'static str,
        rhs: &'static str,
    },
}

/// An unsigned fixed-point fraction with 18 decimals.
///
/// Slippage and fee bounds live in `[0, ONE]`; setters reject anything above
/// `ONE` as a configuration error.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FixedPoint(u64);

impl FixedPoint {
    /// The fixed-point unit (1.0).
    pub const ONE: FixedPoint = FixedPoint(1_000_000_000_000_000_000);
    pub const ZERO: FixedPoint = FixedPoint(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_above_one(&self) -> bool {
        *self > Self::ONE
    }
}

impl std::fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = Self::ONE.0;
        write!(f, "{}.{:018}", self.0 / unit, self.0 % unit)
    }
}
