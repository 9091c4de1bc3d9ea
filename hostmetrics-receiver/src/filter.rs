//! Include/exclude filtering of device and process names.
//!
//! Patterns are compiled once when a scraper is built. Matching is
//! case-sensitive and applied to names exactly as the OS reports them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ScraperError;

/// How the configured names are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Exact string equality.
    #[default]
    Strict,
    /// Regular expression, matched anywhere in the name.
    Regexp,
    /// Glob pattern (e.g. "sd*"), matched against the whole name.
    Glob,
}

/// A list of names plus the way to match them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Names or patterns.
    #[serde(default, alias = "devices")]
    pub names: Vec<String>,

    #[serde(default)]
    pub match_type: MatchType,
}

impl FilterConfig {
    pub fn new(names: &[&str], match_type: MatchType) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            match_type,
        }
    }
}

/// Compiled set of names.
#[derive(Debug)]
pub enum FilterSet {
    Strict(HashSet<String>),
    Regexp(Vec<Regex>),
}

impl FilterSet {
    /// Compile a filter set.
    pub fn new(config: &FilterConfig) -> Result<Self, regex::Error> {
        match config.match_type {
            MatchType::Strict => Ok(FilterSet::Strict(config.names.iter().cloned().collect())),
            MatchType::Regexp => config
                .names
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()
                .map(FilterSet::Regexp),
            MatchType::Glob => config
                .names
                .iter()
                .map(|p| Regex::new(&glob_to_regex(p)))
                .collect::<Result<Vec<_>, _>>()
                .map(FilterSet::Regexp),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            FilterSet::Strict(names) => names.contains(name),
            FilterSet::Regexp(patterns) => patterns.iter().any(|re| re.is_match(name)),
        }
    }
}

/// Convert a glob pattern to an anchored regex pattern.
fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2 + 2);
    regex.push('^');

    for c in glob.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    regex.push('$');
    regex
}

/// Include/exclude pair applied to instance names.
///
/// A name is kept iff (there is no include set or it matches the include
/// set) and (there is no exclude set or it does not match the exclude set).
#[derive(Debug, Default)]
pub struct DeviceFilter {
    include: Option<FilterSet>,
    exclude: Option<FilterSet>,
}

impl DeviceFilter {
    /// Build a filter; empty name lists compile to "no restriction".
    pub fn new(
        include: Option<&FilterConfig>,
        exclude: Option<&FilterConfig>,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            include: compile(include, "include")?,
            exclude: compile(exclude, "exclude")?,
        })
    }

    /// Filter with no restriction.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn include(&self) -> Option<&FilterSet> {
        self.include.as_ref()
    }

    pub fn exclude(&self) -> Option<&FilterSet> {
        self.exclude.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Check if a name passes the filter.
    pub fn matches(&self, name: &str) -> bool {
        passes(self.include.as_ref(), self.exclude.as_ref(), name)
    }
}

fn compile(
    config: Option<&FilterConfig>,
    kind: &'static str,
) -> Result<Option<FilterSet>, ScraperError> {
    config
        .filter(|c| !c.names.is_empty())
        .map(FilterSet::new)
        .transpose()
        .map_err(|source| ScraperError::Filter { kind, source })
}

/// Shared include/exclude precedence, also used by the performance-counter backend.
pub(crate) fn passes(include: Option<&FilterSet>, exclude: Option<&FilterSet>, name: &str) -> bool {
    if let Some(include) = include {
        if !include.matches(name) {
            return false;
        }
    }

    !exclude.is_some_and(|exclude| exclude.matches(name))
}
