// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern which designates the front page
pub const FRONT_PAGE: &str = "<front>";

/// How the path patterns select the gated pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Only the listed pages are gated
    Include,

    /// Every page except the listed ones is gated
    #[default]
    Exclude,
}

/// Selects which pages show the gate
#[derive(Debug, Clone)]
pub struct PathTargeting {
    mode: PathMode,
    matcher: Option<Regex>,
}

impl Default for PathTargeting {
    fn default() -> Self {
        Self {
            mode: PathMode::Exclude,
            matcher: None,
        }
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    if pattern == FRONT_PAGE {
        return "/".to_owned();
    }

    let pattern = if pattern.starts_with('/') {
        pattern.to_owned()
    } else {
        format!("/{pattern}")
    };

    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

impl PathTargeting {
    /// Build the targeting from a mode and a list of patterns.
    ///
    /// Blank patterns are ignored. `*` matches any run of characters, and
    /// `<front>` matches the front page.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined patterns are too large to compile
    pub fn new<I, S>(mode: PathMode, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = patterns
            .into_iter()
            .filter_map(|pattern| {
                let pattern = pattern.as_ref().trim();
                (!pattern.is_empty()).then(|| pattern_to_regex(pattern))
            })
            .collect();

        let matcher = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("^(?:{})$", alternatives.join("|")))?)
        };

        Ok(Self { mode, matcher })
    }

    /// The mode used by this targeting
    #[must_use]
    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Whether the gate applies to the page at `path`
    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        let listed = self
            .matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(path));

        match self.mode {
            PathMode::Include => listed,
            PathMode::Exclude => !listed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gates_everything() {
        let targeting = PathTargeting::default();
        assert!(targeting.applies_to("/"));
        assert!(targeting.applies_to("/node/1"));
    }

    #[test]
    fn test_include() {
        let targeting =
            PathTargeting::new(PathMode::Include, ["<front>", "blog/*", "/shop", ""]).unwrap();

        assert!(targeting.applies_to("/"));
        assert!(targeting.applies_to("/blog/some-post"));
        assert!(targeting.applies_to("/blog/"));
        assert!(targeting.applies_to("/shop"));
        assert!(!targeting.applies_to("/shop/cart"));
        assert!(!targeting.applies_to("/blog"));
        assert!(!targeting.applies_to("/about"));
    }

    #[test]
    fn test_include_nothing() {
        let targeting = PathTargeting::new(PathMode::Include, Vec::<String>::new()).unwrap();
        assert!(!targeting.applies_to("/"));
    }

    #[test]
    fn test_exclude() {
        let targeting = PathTargeting::new(PathMode::Exclude, ["/legal/*", "/about"]).unwrap();

        assert!(targeting.applies_to("/"));
        assert!(targeting.applies_to("/shop"));
        assert!(!targeting.applies_to("/about"));
        assert!(!targeting.applies_to("/legal/terms"));
    }

    #[test]
    fn test_patterns_are_literal() {
        let targeting = PathTargeting::new(PathMode::Include, ["/a.b", "/(x)"]).unwrap();
        assert!(targeting.applies_to("/a.b"));
        assert!(!targeting.applies_to("/aXb"));
        assert!(targeting.applies_to("/(x)"));
    }
}
