//! Well-known operation selectors.
//!
//! Setter selectors are shared by every task; call selectors belong to the
//! concrete task kinds.

pub const CALL_COLLECT: &str = "collect";
pub const CALL_WITHDRAW: &str = "withdraw";
pub const CALL_EXECUTE: &str = "execute";

pub const SET_CONNECTOR: &str = "set_connector";
pub const SET_RECIPIENT: &str = "set_recipient";
pub const SET_DEFAULT_DESTINATION_CHAIN: &str = "set_default_destination_chain";
pub const SET_CUSTOM_DESTINATION_CHAIN: &str = "set_custom_destination_chain";
pub const SET_DEFAULT_MAX_SLIPPAGE: &str = "set_default_max_slippage";
pub const SET_CUSTOM_MAX_SLIPPAGE: &str = "set_custom_max_slippage";
pub const SET_BALANCE_CONNECTORS: &str = "set_balance_connectors";
pub const SET_TOKENS_ACCEPTANCE_TYPE: &str = "set_tokens_acceptance_type";
pub const SET_TOKENS_ACCEPTANCE_LIST: &str = "set_tokens_acceptance_list";
pub const SET_DEFAULT_TOKEN_THRESHOLD: &str = "set_default_token_threshold";
pub const SET_CUSTOM_TOKEN_THRESHOLD: &str = "set_custom_token_threshold";

/// Setter selectors with a fixed argument count, used to seed the
/// authorizer's arity registry at task construction.
pub const SETTER_ARITIES: &[(&str, usize)] = &[
    (SET_CONNECTOR, 1),
    (SET_RECIPIENT, 1),
    (SET_DEFAULT_DESTINATION_CHAIN, 1),
    (SET_CUSTOM_DESTINATION_CHAIN, 2),
    (SET_DEFAULT_MAX_SLIPPAGE, 1),
    (SET_CUSTOM_MAX_SLIPPAGE, 2),
    (SET_BALANCE_CONNECTORS, 2),
    (SET_TOKENS_ACCEPTANCE_TYPE, 1),
    (SET_DEFAULT_TOKEN_THRESHOLD, 2),
    (SET_CUSTOM_TOKEN_THRESHOLD, 3),
];
