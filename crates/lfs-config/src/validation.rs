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

//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Validator for configuration settings
pub trait Validator {
    /// Check the settings, naming the first bad field
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.storage.validate()?;
        self.fetch.validate()?;
        self.scan.validate()?;
        Ok(())
    }
}

impl Validator for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(dir) = &self.lfs_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "storage.lfs_dir",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

impl Validator for FetchConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (field, patterns) in [("fetch.include", &self.include), ("fetch.exclude", &self.exclude)] {
            if let Some(pattern) = patterns.iter().find(|p| p.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("blank pattern {:?}", pattern),
                ));
            }
        }
        Ok(())
    }
}

impl Validator for ScanConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "scan.channel_capacity",
                "must be greater than 0",
            ));
        }
        if self.tree_concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "scan.tree_concurrency",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
