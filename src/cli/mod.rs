//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes defining the flags, handling user interaction (prompts, the export
//! progress animation), and wiring the configuration store to the pipeline.

mod commands;
mod progress;
mod prompt;

pub use commands::*;
pub use progress::*;
pub use prompt::*;
