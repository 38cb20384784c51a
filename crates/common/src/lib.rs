//! edgecheck common library
//!
//! Configuration and shared records for the edgecheck deployment harness.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EnvConfig, WasmerConfig};
pub use error::{Error, Result};
pub use types::*;

/// edgecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
