//! Parameter predicates: constraint expressions over an operation's arguments.
//!
//! A predicate is an ordered sequence of clauses, each binding one positional
//! argument to an operator and a literal. All clauses AND together; the empty
//! predicate is the unconditional grant. Evaluation never panics: a clause
//! addressing a missing argument, or comparing incomparable values, simply
//! fails.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use vault_types::ParamValue;

/// Operator applied by a single clause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamOp {
    Eq(ParamValue),
    Neq(ParamValue),
    Gt(ParamValue),
    Lt(ParamValue),
    Gte(ParamValue),
    Lte(ParamValue),
    /// Set membership against a literal list.
    In(Vec<ParamValue>),
    NotIn(Vec<ParamValue>),
}

/// One constraint over one positional argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamClause {
    pub index: usize,
    pub op: ParamOp,
}

impl ParamClause {
    pub fn new(index: usize, op: ParamOp) -> Self {
        Self { index, op }
    }

    fn holds(&self, args: &[ParamValue]) -> bool {
        let Some(arg) = args.get(self.index) else {
            // Out-of-range clause against an unregistered selector: deny.
            return false;
        };

        match &self.op {
            ParamOp::Eq(value) => arg == value,
            ParamOp::Neq(value) => arg != value,
            ParamOp::Gt(value) => ordered(arg, value, Ordering::Greater, false),
            ParamOp::Lt(value) => ordered(arg, value, Ordering::Less, false),
            ParamOp::Gte(value) => ordered(arg, value, Ordering::Greater, true),
            ParamOp::Lte(value) => ordered(arg, value, Ordering::Less, true),
            ParamOp::In(values) => values.contains(arg),
            ParamOp::NotIn(values) => !values.contains(arg),
        }
    }
}

fn ordered(arg: &ParamValue, literal: &ParamValue, want: Ordering, or_equal: bool) -> bool {
    match arg.compare(literal) {
        Ok(ordering) => ordering == want || (or_equal && ordering == Ordering::Equal),
        Err(_) => false,
    }
}

/// An AND-composed constraint expression over call arguments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    clauses: Vec<ParamClause>,
}

impl Predicate {
    /// The empty predicate: every call passes.
    pub fn unconditional() -> Self {
        Self::default()
    }

    pub fn with_clauses(clauses: Vec<ParamClause>) -> Self {
        Self { clauses }
    }

    pub fn is_unconditional(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[ParamClause] {
        &self.clauses
    }

    /// Highest argument index any clause addresses.
    pub fn max_index(&self) -> Option<usize> {
        self.clauses.iter().map(|clause| clause.index).max()
    }

    /// True iff every clause holds on the given arguments.
    pub fn evaluate(&self, args: &[ParamValue]) -> bool {
        self.clauses.iter().all(|clause| clause.holds(args))
    }
}
