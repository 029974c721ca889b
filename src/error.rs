//! Defines the application's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` to allow `AppError` to be cloneable.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Exit status used when the operator interrupts the run.
pub const EXIT_CANCELLED: i32 = 130;

/// The primary error enumeration for all application-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// A line in the env file has no `KEY=VALUE` separator.
    #[error("Malformed line {line} in {path}: '{content}' (expected KEY=VALUE)")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// A required key is absent from the configuration record.
    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    /// Error related to standard I/O operations.
    #[error("I/O Error: {0}")]
    Io(Arc<io::Error>),

    /// Error originating from user interaction prompts (`dialoguer`).
    #[error("Dialoguer Error: {0}")]
    Dialoguer(Arc<dialoguer::Error>),

    /// Error related to progress bar style templating (`indicatif`).
    #[error("Progress Style Template Error: {0}")]
    Template(Arc<indicatif::style::TemplateError>),

    /// The external binary could not be spawned at all.
    #[error("{program} command not found. Please install it and make sure it is on PATH.")]
    ToolNotFound { program: String },

    /// An external command exited unsuccessfully.
    #[error("Command '{command}' failed with {}", describe_code(.code))]
    CommandFailed { command: String, code: Option<i32> },

    /// The container engine could not be contacted.
    #[error("The Docker engine is not running ('{program} info' failed). Start Docker and try again.")]
    EngineUnreachable { program: String },

    /// The base build description to derive the generated one from does not exist.
    #[error("Build description not found: {path}")]
    MissingBuildDescription { path: PathBuf },

    /// The operator interrupted the run.
    #[error("Operation cancelled by user.")]
    Cancelled,
}

impl AppError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Cancelled => EXIT_CANCELLED,
            _ => 1,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "termination by signal".to_string(),
    }
}

/// A specialized `Result` type using the application's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// --- From implementations ---
// These allow easy conversion from external error types into AppError
// using the `?` operator. Arc is used for non-Clone error types.

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(Arc::new(err))
    }
}

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        match &err {
            // Ctrl-C inside a raw-mode prompt surfaces as an interrupted read
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => {
                AppError::Cancelled
            },
            _ => AppError::Dialoguer(Arc::new(err)),
        }
    }
}

impl From<indicatif::style::TemplateError> for AppError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        AppError::Template(Arc::new(err))
    }
}
