pub mod analyze;
pub mod app;
pub mod cli;
pub mod config;
pub mod convert;
pub mod core;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod naming;
pub mod requirements;
pub mod utils;
pub mod validate;

pub use error::{DojoError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
