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
// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! # Large-file object store
//!
//! The local content-addressed store that pointer records resolve to, and
//! the checks run over it.
//!
//! ## Layout
//!
//! ```text
//! .git/lfs/
//! ├── objects/
//! │   └── 4d/7a/4d7a2146...   content, named by its SHA-256
//! └── bad/
//!     └── 4d7a2146...         quarantined corrupt objects
//! ```
//!
//! ## Checks
//!
//! - [`IntegrityChecker`]: rehashes stored bytes, quarantines corruption
//! - [`check_pointers`]: finds non-canonical pointers and tracked paths
//!   holding plain blobs

pub mod error;
pub mod fsck;
pub mod oid;
pub mod store;
pub mod validity;

pub use error::{StoreError, StoreResult};
pub use fsck::{
    collect_pointers, IntegrityChecker, IntegrityOptions, IntegrityReport, IntegrityResult,
    ObjectOutcome,
};
pub use oid::ContentOid;
pub use store::{ObjectStore, StoredObject};
pub use validity::{check_pointers, PointerFinding, PointerReport};
