// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Lockable path detection
//!
//! "No locking configured" is its own variant rather than an absent value,
//! so callers never need to special-case it.

use crate::names::NameMap;
use crate::oid::ObjectId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A read-only set of path names
pub trait NameSet: fmt::Debug + Send + Sync {
    /// Whether `name` is in the set
    fn contains(&self, name: &str) -> bool;
}

impl NameSet for HashSet<String> {
    fn contains(&self, name: &str) -> bool {
        HashSet::contains(self, name)
    }
}

/// Answers whether a discovered blob sits at a lockable path
#[derive(Debug, Clone, Default)]
pub enum LockableMatcher {
    /// Nothing is lockable
    #[default]
    None,
    /// Paths in the set are lockable
    Configured(Arc<dyn NameSet>),
}

impl LockableMatcher {
    /// Matcher backed by `set`
    pub fn configured(set: impl NameSet + 'static) -> Self {
        LockableMatcher::Configured(Arc::new(set))
    }

    /// Resolve the name recorded for `sha` and test it for lockability
    ///
    /// Returns the name (if any was recorded) and whether it is lockable.
    pub fn check(&self, sha: &ObjectId, names: &NameMap) -> (Option<String>, bool) {
        let LockableMatcher::Configured(set) = self else {
            return (None, false);
        };
        match names.get(sha) {
            Some(name) => {
                let lockable = set.contains(&name);
                (Some(name), lockable)
            }
            None => (None, false),
        }
    }

    /// Whether any lockable set is configured
    pub fn is_configured(&self) -> bool {
        matches!(self, LockableMatcher::Configured(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sha(c: char) -> ObjectId {
        ObjectId::from_hex(&c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn test_none_matches_nothing() {
        let names = NameMap::new();
        names.set(&sha('a'), "locked.psd");
        assert_eq!(LockableMatcher::None.check(&sha('a'), &names), (None, false));
    }

    #[test]
    fn test_configured_set() {
        let names = NameMap::new();
        names.set(&sha('a'), "locked.psd");
        names.set(&sha('b'), "free.txt");

        let set: HashSet<String> = ["locked.psd".to_string()].into_iter().collect();
        let matcher = LockableMatcher::configured(set);

        assert_eq!(
            matcher.check(&sha('a'), &names),
            (Some("locked.psd".to_string()), true)
        );
        assert_eq!(
            matcher.check(&sha('b'), &names),
            (Some("free.txt".to_string()), false)
        );
        assert_eq!(matcher.check(&sha('c'), &names), (None, false));
    }
}
