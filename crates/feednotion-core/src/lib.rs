pub mod config;
pub mod error;
pub mod feed;
pub mod extract;
pub mod ai;
pub mod store;
pub mod scheduler;

pub use config::AppConfig;
pub use error::{Error, Result};
