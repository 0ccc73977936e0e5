//! Credential storage and trade normalization.

pub mod normalize;
pub mod token_store;

pub use normalize::{
    normalize_kite_trade, normalize_trade, normalize_trades, normalizer_for, Normalizer,
};
pub use token_store::{TokenKey, TokenStore};
