//! Defines the data structures and models used throughout the application.
//!
//! This includes the configuration record handed to the container engine,
//! the per-run build artifacts, and the settings resolved from the command line.

mod build;
mod env;
mod settings;

pub use build::*;
pub use env::*;
pub use settings::*;
