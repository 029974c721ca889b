//! Defines the per-run build artifacts.
//!
//! Includes:
//! - `BuildTarget`: the time-stamped name shared by the image, the container and the archive.
//! - `GeneratedDockerfile`: the derived build description, removed again when dropped.

use crate::error::{AppError, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the derived build description, written next to the base one.
pub const GENERATED_DOCKERFILE: &str = "Dockerfile.generated";

/// Extension of the exported filesystem archive.
pub const ARCHIVE_EXTENSION: &str = "wsl";

/// Appended to the build description in debug mode so the container boots systemd
/// with an autologin console.
pub const SYSTEMD_SNIPPET: &str = r#"
USER root

RUN mkdir -p /etc/systemd/system/getty@tty1.service.d && \
    echo "[Service]\nExecStart=\nExecStart=-/sbin/agetty --noclear %I \$TERM" > /etc/systemd/system/getty@tty1.service.d/override.conf

RUN pacman -Sy --noconfirm systemd-sysvcompat

ENV container=docker

STOPSIGNAL SIGRTMIN+3
CMD ["/usr/lib/systemd/systemd"]
"#;

/// Name of the artifact produced by one build. Image tag, container name and archive
/// stem all use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget(String);

impl BuildTarget {
    /// Creates a target named `<prefix>_<YYYYmmdd_HHMMSS>` from the current local time.
    pub fn generate(prefix: &str) -> Self {
        Self::at(prefix, Local::now())
    }

    /// Creates a target for the given timestamp.
    pub fn at(prefix: &str, when: DateTime<Local>) -> Self {
        BuildTarget(format!("{}_{}", prefix, when.format("%Y%m%d_%H%M%S")))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Image reference used when starting the export container.
    pub fn image_ref(&self) -> String {
        format!("{}:latest", self.0)
    }

    /// Path of the exported archive inside `dir`.
    pub fn archive_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{}", self.0, ARCHIVE_EXTENSION))
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders the build description: the base content, plus the systemd snippet in debug mode.
pub fn render_build_description(base: &str, debug_mode: bool) -> String {
    let mut content = base.to_string();
    if debug_mode {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(SYSTEMD_SNIPPET);
    }
    content
}

/// A generated build description on disk. The file is deleted when the value is dropped,
/// so it never outlives the build step, whether the build succeeded or not.
#[derive(Debug)]
pub struct GeneratedDockerfile {
    path: PathBuf,
}

impl GeneratedDockerfile {
    /// Reads `base`, renders it and writes the result to `Dockerfile.generated`
    /// in the same directory.
    pub fn write(base: &Path, debug_mode: bool) -> Result<Self> {
        let content = fs::read_to_string(base).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::MissingBuildDescription {
                    path: base.to_path_buf(),
                }
            } else {
                AppError::from(e)
            }
        })?;

        let dir = base.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(GENERATED_DOCKERFILE);
        fs::write(&path, render_build_description(&content, debug_mode))?;
        debug!("Wrote generated build description to {}", path.display());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for GeneratedDockerfile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
