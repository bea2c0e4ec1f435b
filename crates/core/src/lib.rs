pub mod backoff;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use backoff::Backoff;
pub use config::Config;
pub use error::{Error, Result};
pub use paths::Paths;
