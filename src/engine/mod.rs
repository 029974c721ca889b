//! Provides the external tools the pipeline drives.
//!
//! Includes:
//! - `runner`: the `CommandRunner` seam and the process-spawning implementation.
//! - `docker`: command lines for docker, wsl and git.

mod docker;
mod runner;

pub use docker::*;
pub use runner::*;
