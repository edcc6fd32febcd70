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
//! Configuration for large-file scanning and storage
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `git config` entries (`lfs.storage`, `lfs.fetchinclude`,
//!    `lfs.fetchexclude`, `lfs.scan.channelcapacity`,
//!    `lfs.scan.treeconcurrency`)
//! 3. `GIT_LFS_*` environment variables
//!
//! # Example
//!
//! ```
//! use lfs_config::ConfigLoader;
//!
//! let entries = vec![("lfs.fetchinclude".to_string(), "media/**".to_string())];
//! let config = ConfigLoader::new().load_with_env(&entries, |_| None).unwrap();
//! assert_eq!(config.fetch.include, vec!["media/**"]);
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::*;
pub use validation::Validator;
