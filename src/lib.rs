//! Chassis configuration library
//!
//! Layered configuration sources, `key=value` overrides, path lookup and
//! typed schema binding, plus the lifecycle used by the `chassis` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod lifecycle;

pub use error::{ConfigError, ConfigResult, ErrorCode};
pub use lifecycle::{Configurator, Runnable};
