// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Path patterns and the include/exclude path filter
//!
//! Patterns follow `.gitattributes` rules: a pattern without a slash matches
//! the file name at any depth below the directory it was declared in, a
//! pattern with a slash is anchored to that directory. `*` never crosses a
//! `/`; use `**` for that.

use glob::{MatchOptions, Pattern, PatternError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A single path pattern, optionally scoped to a base directory
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    base: String,
    pattern: Pattern,
    basename_only: bool,
}

impl PathPattern {
    /// Pattern declared at the repository root
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        Self::with_base(raw, "")
    }

    /// Pattern declared in directory `base` (relative, `/`-separated)
    pub fn with_base(raw: &str, base: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim_end_matches('/');
        let basename_only = !trimmed.contains('/');
        let anchored = trimmed.trim_start_matches('/');
        Ok(Self {
            raw: raw.to_string(),
            base: base.trim_matches('/').to_string(),
            pattern: Pattern::new(anchored)?,
            basename_only,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `path` (repository-relative, `/`-separated) matches
    pub fn matches(&self, path: &str) -> bool {
        let relative = if self.base.is_empty() {
            path
        } else {
            match path
                .strip_prefix(self.base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            }
        };

        if self.basename_only {
            let name = relative.rsplit('/').next().unwrap_or(relative);
            self.pattern.matches_with(name, MATCH_OPTIONS)
        } else {
            self.pattern.matches_with(relative, MATCH_OPTIONS)
        }
    }

    /// Whether `path` or any directory containing it matches
    pub fn matches_path_or_parent(&self, path: &str) -> bool {
        let mut candidate = path;
        loop {
            if self.matches(candidate) {
                return true;
            }
            match candidate.rfind('/') {
                Some(idx) => candidate = &candidate[..idx],
                None => return false,
            }
        }
    }
}

/// Include/exclude filter applied to discovered path names
///
/// An empty include list allows everything; any exclude match rejects.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
}

impl PathFilter {
    /// Build a filter from raw pattern strings
    pub fn new<I, E, S1, S2>(include: I, exclude: E) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S1>,
        E: IntoIterator<Item = S2>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let include = include
            .into_iter()
            .map(|p| PathPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = exclude
            .into_iter()
            .map(|p| PathPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { include, exclude })
    }

    /// A filter that allows every path
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether the filter lets `path` through
    pub fn allows(&self, path: &str) -> bool {
        if !self.include.is_empty()
            && !self.include.iter().any(|p| p.matches_path_or_parent(path))
        {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches_path_or_parent(path))
    }
}
