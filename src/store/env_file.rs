//! Flat `KEY=VALUE` persistence for the configuration record.
//!
//! The file format is intentionally minimal: one pair per line, no quoting,
//! blank lines and `#` comments ignored. A non-comment line without `=` is a
//! hard error.

use crate::cli::Prompter;
use crate::error::{AppError, Result};
use crate::models::{EnvMap, REQUIRED_KEYS};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner-only permissions for the file, since it holds a password.
#[cfg(unix)]
const ENV_FILE_PERMISSIONS: u32 = 0o600;

/// Reads and writes the env file at a fixed path.
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the stored mapping. A missing file yields an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigParse` on the first line lacking a `=` separator.
    pub fn load(&self) -> Result<EnvMap> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                return Ok(EnvMap::new());
            },
            Err(e) => return Err(e.into()),
        };
        let map = parse_env(&content, &self.path)?;
        debug!("Loaded {} keys from {}", map.len(), self.path.display());
        Ok(map)
    }

    /// Writes the complete mapping, replacing the file.
    pub fn save(&self, map: &EnvMap) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        for (key, value) in map {
            writeln!(file, "{}={}", key, value)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(ENV_FILE_PERMISSIONS);
            file.set_permissions(perms)?;
        }

        info!("Saved {} keys to {}", map.len(), self.path.display());
        Ok(())
    }

    /// Deletes the file. Returns whether there was anything to delete.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed {}", self.path.display());
                Ok(true)
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Fills in every required key missing from `map`, then persists the merged mapping.
    ///
    /// With `force_defaults` no question is asked and missing keys take their defaults.
    /// Keys already present are never asked for again.
    pub fn prompt_missing(
        &self,
        mut map: EnvMap,
        prompter: &dyn Prompter,
        force_defaults: bool,
    ) -> Result<EnvMap> {
        for required in REQUIRED_KEYS.iter() {
            if map.contains_key(required.key) {
                continue;
            }
            let value = if force_defaults {
                required.default.to_string()
            } else {
                prompter.input(required.label, required.default)?
            };
            debug!("{} set", required.key);
            map.insert(required.key.to_string(), value);
        }

        self.save(&map)?;
        Ok(map)
    }
}

/// Parses env file content. `origin` is only used in error messages.
pub fn parse_env(content: &str, origin: &Path) -> Result<EnvMap> {
    let mut map = EnvMap::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = line
            .split_once('=')
            .map(|(key, value)| (key.trim(), value))
            .filter(|(key, _)| !key.is_empty());

        match parsed {
            Some((key, value)) => {
                map.insert(key.to_string(), value.to_string());
            },
            None => {
                return Err(AppError::ConfigParse {
                    path: origin.to_path_buf(),
                    line: idx + 1,
                    content: line.to_string(),
                })
            },
        }
    }

    Ok(map)
}
