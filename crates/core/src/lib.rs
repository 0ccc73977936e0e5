pub mod error;
pub mod expiry;
pub mod models;
pub mod traits;

pub use error::*;
pub use models::*;
pub use traits::*;
