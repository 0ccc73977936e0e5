//! Zerodha Kite Connect broker adapter.
//!
//! Talks to the Kite Connect v3 REST API: login URL generation, request
//! token exchange, and the private trades endpoint. Kite access tokens cannot
//! be refreshed; an expired token requires the user to log in again.

pub mod client;
pub mod protocol;

pub use client::{ZerodhaBroker, ZerodhaConfig};
