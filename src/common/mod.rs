//! Common utilities: errors, logging, configuration

pub mod config;
pub mod env;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
