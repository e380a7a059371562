pub mod config;
pub mod error;
pub mod types;

pub use error::{RedexterError, RedexterResult};
pub use types::{BatchState, ConfigSection};
