//! Provides persistence for the configuration record.
//!
//! Currently, this module holds the flat env file store via the `env_file` submodule.

mod env_file;

pub use env_file::*;
