//! Run-wide settings resolved from the command line.

use std::path::{Path, PathBuf};

/// What the pipeline does after the image is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Export the image as a WSL archive, offer the import and cleanup.
    Install,
    /// Build with systemd as init and run the image with an interactive terminal.
    Debug,
}

/// Everything the pipeline needs to know about the environment it runs in.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory the build context, submodules and default export location live in.
    pub work_dir: PathBuf,
    pub env_file: PathBuf,
    pub dockerfile: PathBuf,
    pub name_prefix: String,
    pub docker_bin: String,
    pub wsl_bin: String,
    pub no_cache: bool,
    /// Answer every prompt with its default.
    pub assume_yes: bool,
}

impl Settings {
    /// Settings rooted at `work_dir` with the stock file names and binaries.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            env_file: work_dir.join(".env"),
            dockerfile: work_dir.join("Dockerfile"),
            work_dir,
            name_prefix: "devkit".to_string(),
            docker_bin: "docker".to_string(),
            wsl_bin: "wsl".to_string(),
            no_cache: false,
            assume_yes: false,
        }
    }

    /// Resolves `path` against the work directory unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
