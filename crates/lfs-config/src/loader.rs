// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Layered configuration loading
//!
//! Defaults, then `git config` entries, then `GIT_LFS_*` environment
//! variables; later layers win.

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{split_patterns, Config};
use crate::validation::Validator;
use std::path::PathBuf;
use tracing::{debug, info};

/// Git config key for the store location
pub const KEY_STORAGE: &str = "lfs.storage";
/// Git config key for include patterns
pub const KEY_FETCH_INCLUDE: &str = "lfs.fetchinclude";
/// Git config key for exclude patterns
pub const KEY_FETCH_EXCLUDE: &str = "lfs.fetchexclude";
/// Git config key for the channel bound
pub const KEY_CHANNEL_CAPACITY: &str = "lfs.scan.channelcapacity";
/// Git config key for tree workers
pub const KEY_TREE_CONCURRENCY: &str = "lfs.scan.treeconcurrency";

/// Configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load from `git config -z --list` entries and the process environment
    pub fn load(&self, entries: &[(String, String)]) -> ConfigResult<Config> {
        self.load_with_env(entries, |name| std::env::var(name).ok())
    }

    /// Load from git config entries and an arbitrary environment lookup
    pub fn load_with_env<F>(&self, entries: &[(String, String)], env: F) -> ConfigResult<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        self.apply_git_config(&mut config, entries)?;
        self.apply_env_overrides(&mut config, env)?;

        if self.validate {
            config.validate()?;
            debug!("Configuration validated successfully");
        }
        info!(
            channel_capacity = config.scan.channel_capacity,
            tree_concurrency = config.scan.tree_concurrency,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply git config entries; keys are expected lowercased, last one wins
    pub fn apply_git_config(
        &self,
        config: &mut Config,
        entries: &[(String, String)],
    ) -> ConfigResult<()> {
        for (key, value) in entries {
            match key.as_str() {
                KEY_STORAGE => config.storage.lfs_dir = Some(PathBuf::from(value)),
                KEY_FETCH_INCLUDE => config.fetch.include = split_patterns(value),
                KEY_FETCH_EXCLUDE => config.fetch.exclude = split_patterns(value),
                KEY_CHANNEL_CAPACITY => {
                    config.scan.channel_capacity = parse_count(value).ok_or_else(|| {
                        ConfigError::git_config_parsing_error(key, value, "expected a positive integer")
                    })?
                }
                KEY_TREE_CONCURRENCY => {
                    config.scan.tree_concurrency = parse_count(value).ok_or_else(|| {
                        ConfigError::git_config_parsing_error(key, value, "expected a positive integer")
                    })?
                }
                _ => continue,
            }
            debug!(key = %key, "Applied git config entry");
        }
        Ok(())
    }

    /// Apply `GIT_LFS_*` overrides
    pub fn apply_env_overrides<F>(&self, config: &mut Config, env: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env("GIT_LFS_STORAGE") {
            config.storage.lfs_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env("GIT_LFS_FETCH_INCLUDE") {
            config.fetch.include = split_patterns(&value);
        }
        if let Some(value) = env("GIT_LFS_FETCH_EXCLUDE") {
            config.fetch.exclude = split_patterns(&value);
        }
        if let Some(value) = env("GIT_LFS_SCAN_CHANNEL_CAPACITY") {
            config.scan.channel_capacity = parse_count(&value).ok_or_else(|| {
                ConfigError::env_var_parsing_error(
                    "GIT_LFS_SCAN_CHANNEL_CAPACITY",
                    &value,
                    "expected a positive integer",
                )
            })?;
        }
        if let Some(value) = env("GIT_LFS_SCAN_TREE_CONCURRENCY") {
            config.scan.tree_concurrency = parse_count(&value).ok_or_else(|| {
                ConfigError::env_var_parsing_error(
                    "GIT_LFS_SCAN_TREE_CONCURRENCY",
                    &value,
                    "expected a positive integer",
                )
            })?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_count(value: &str) -> Option<usize> {
    value.trim().parse().ok()
}
