//! Broker adapters that need no external service.

pub mod mock;

pub use mock::{MockBroker, MockBrokerConfig};
