pub mod factory;
pub mod locks;
pub mod sync;

pub use factory::{AdapterFactory, BrokerAdapters};
pub use locks::KeyedLocks;
pub use sync::{SyncOrchestrator, TokenStatus};
