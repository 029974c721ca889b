//! The configuration record passed to every build and run step.

use crate::error::{AppError, Result};
use std::collections::BTreeMap;

/// Flat key/value mapping as stored in the env file.
pub type EnvMap = BTreeMap<String, String>;

pub const KEY_USER: &str = "DOCKER_USER";
pub const KEY_PASSWORD: &str = "DOCKER_USER_PASSWD";
pub const KEY_GROUP: &str = "DOCKER_GROUP";

pub const DEFAULT_USER: &str = "user";
pub const DEFAULT_PASSWORD: &str = DEFAULT_USER;
pub const DEFAULT_GROUP: &str = "users";

/// A key the configuration record must contain, with its prompt label and default.
#[derive(Debug, Clone, Copy)]
pub struct RequiredKey {
    pub key: &'static str,
    pub label: &'static str,
    pub default: &'static str,
}

/// Keys prompted for, in prompt order.
pub const REQUIRED_KEYS: [RequiredKey; 3] = [
    RequiredKey {
        key: KEY_USER,
        label: "Docker username",
        default: DEFAULT_USER,
    },
    RequiredKey {
        key: KEY_PASSWORD,
        label: "Docker user password",
        default: DEFAULT_PASSWORD,
    },
    RequiredKey {
        key: KEY_GROUP,
        label: "Docker group",
        default: DEFAULT_GROUP,
    },
];

/// Typed view of the configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    pub user: String,
    pub password: String,
    pub group: String,
}

impl BuildEnv {
    /// Extracts the required keys from a loaded mapping.
    pub fn from_map(map: &EnvMap) -> Result<Self> {
        let get = |key: &str| {
            map.get(key)
                .cloned()
                .ok_or_else(|| AppError::MissingConfigKey(key.to_string()))
        };
        Ok(Self {
            user: get(KEY_USER)?,
            password: get(KEY_PASSWORD)?,
            group: get(KEY_GROUP)?,
        })
    }

    /// `KEY=VALUE` pairs in a stable order, as handed to `--build-arg` and `-e`.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (KEY_USER, self.user.as_str()),
            (KEY_PASSWORD, self.password.as_str()),
            (KEY_GROUP, self.group.as_str()),
        ]
    }

    /// Expands to `flag KEY=VALUE` for every pair.
    pub fn as_flags(&self, flag: &str) -> Vec<String> {
        self.pairs()
            .iter()
            .flat_map(|(k, v)| [flag.to_string(), format!("{}={}", k, v)])
            .collect()
    }
}
