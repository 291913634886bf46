//! Core types, configuration, and error handling for cadence.
//!
//! This crate provides the shared foundation used by the other cadence crates:
//! - [`CadenceError`]: unified error type using `thiserror`
//! - [`CadenceConfig`]: configuration loaded from `.cadence.toml`
//! - [`OutputFormat`]: how reports are printed

mod config;
mod error;
mod types;

pub use config::{
    CadenceConfig, ChartConfig, DatasetConfig, ReviewConfig, ReviewTimezone, CONFIG_FILE_NAME,
};
pub use error::CadenceError;
pub use types::OutputFormat;

/// A convenience `Result` type for cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;
