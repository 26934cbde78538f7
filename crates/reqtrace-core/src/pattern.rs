//! Path-pattern parsing and resolution.
//!
//! A [`PathPattern`] is a user-supplied string with an optional scheme prefix
//! (`glob:` or `regex:`; no prefix means a literal path). Patterns are
//! declared relative to a module root; [`PathPattern::resolve`] rewrites them
//! relative to the build root so the tracing engine sees one consistent
//! namespace across all modules.

use std::fmt;
use std::path::Path;

use globset::GlobBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};

const GLOB_PREFIX: &str = "glob:";
const REGEX_PREFIX: &str = "regex:";

/// Recognized pattern schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternScheme {
    Glob,
    Regex,
    /// No prefix; matches a relative path verbatim.
    Literal,
}

/// A path pattern with its scheme stripped off.
///
/// Serialized as the prefixed string form (`glob:**/*.java`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathPattern {
    scheme: PatternScheme,
    raw: String,
}

impl PathPattern {
    /// Parse a pattern string, recognizing at most one scheme prefix.
    pub fn parse(pattern: &str) -> Self {
        if let Some(body) = pattern.strip_prefix(GLOB_PREFIX) {
            Self {
                scheme: PatternScheme::Glob,
                raw: body.to_string(),
            }
        } else if let Some(body) = pattern.strip_prefix(REGEX_PREFIX) {
            Self {
                scheme: PatternScheme::Regex,
                raw: body.to_string(),
            }
        } else {
            Self {
                scheme: PatternScheme::Literal,
                raw: pattern.to_string(),
            }
        }
    }

    pub fn scheme(&self) -> PatternScheme {
        self.scheme
    }

    /// The pattern body without its scheme prefix.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Rewrite the pattern relative to the build root.
    ///
    /// `module_rel` is the module root's path relative to the build root
    /// (empty for the root module). A separator is inserted only when the
    /// body does not already start with `/` and `module_rel` is non-empty,
    /// so the root module's patterns pass through unchanged. No semantic
    /// validation happens here; malformed bodies are composed as-is and
    /// rejected later by the engine.
    pub fn resolve(&self, module_rel: &str) -> PathPattern {
        let separator = if self.raw.starts_with('/') || module_rel.is_empty() {
            ""
        } else {
            "/"
        };
        PathPattern {
            scheme: self.scheme,
            raw: format!("{module_rel}{separator}{}", self.raw),
        }
    }

    /// Compile into a matcher over module-relative paths.
    pub fn compile(&self) -> Result<PatternMatcher> {
        match self.scheme {
            PatternScheme::Glob => {
                let glob = GlobBuilder::new(&self.raw)
                    .literal_separator(false)
                    .build()
                    .map_err(|e| TraceError::InvalidPattern {
                        pattern: self.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(PatternMatcher::Glob(glob.compile_matcher()))
            }
            PatternScheme::Regex => {
                let regex = Regex::new(&self.raw).map_err(|e| TraceError::InvalidPattern {
                    pattern: self.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(PatternMatcher::Regex(regex))
            }
            PatternScheme::Literal => Ok(PatternMatcher::Literal(self.raw.clone())),
        }
    }
}

impl fmt::Display for PathPattern {
    /// Re-attaches the original scheme prefix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            PatternScheme::Glob => write!(f, "{GLOB_PREFIX}{}", self.raw),
            PatternScheme::Regex => write!(f, "{REGEX_PREFIX}{}", self.raw),
            PatternScheme::Literal => write!(f, "{}", self.raw),
        }
    }
}

impl From<String> for PathPattern {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PathPattern> for String {
    fn from(value: PathPattern) -> Self {
        value.to_string()
    }
}

/// A compiled matcher over slash-separated relative paths.
#[derive(Debug)]
pub enum PatternMatcher {
    Glob(globset::GlobMatcher),
    Regex(Regex),
    Literal(String),
}

impl PatternMatcher {
    /// Match a path relative to the module root.
    pub fn is_match(&self, relative: &Path) -> bool {
        match self {
            PatternMatcher::Glob(matcher) => matcher.is_match(relative),
            PatternMatcher::Regex(regex) => regex.is_match(&path_as_slash_string(relative)),
            PatternMatcher::Literal(literal) => {
                path_as_slash_string(relative) == literal.trim_start_matches('/')
            }
        }
    }
}

fn path_as_slash_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve the covered-item name prefix for a tag source.
///
/// An unset or empty prefix defaults to `"<module_name>."`. An explicit value
/// is taken verbatim: no trailing separator is appended or stripped. The
/// asymmetry with the computed default is deliberate and pinned by test.
pub fn resolve_name_prefix(explicit: Option<&str>, module_name: &str) -> String {
    match explicit {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => format!("{module_name}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_recognizes_glob_prefix() {
        let pattern = PathPattern::parse("glob:**/*.java");
        assert_eq!(pattern.scheme(), PatternScheme::Glob);
        assert_eq!(pattern.raw(), "**/*.java");
    }

    #[test]
    fn test_parse_recognizes_regex_prefix() {
        let pattern = PathPattern::parse("regex:.*\\.impl");
        assert_eq!(pattern.scheme(), PatternScheme::Regex);
        assert_eq!(pattern.raw(), ".*\\.impl");
    }

    #[test]
    fn test_parse_without_prefix_is_literal() {
        let pattern = PathPattern::parse("src/main.rs");
        assert_eq!(pattern.scheme(), PatternScheme::Literal);
        assert_eq!(pattern.raw(), "src/main.rs");
    }

    #[test]
    fn test_display_reattaches_prefix() {
        assert_eq!(PathPattern::parse("glob:**/*.rs").to_string(), "glob:**/*.rs");
        assert_eq!(PathPattern::parse("regex:a+").to_string(), "regex:a+");
        assert_eq!(PathPattern::parse("doc/spec.md").to_string(), "doc/spec.md");
    }

    #[test]
    fn test_resolve_prepends_module_path() {
        let pattern = PathPattern::parse("glob:**/*.java");
        let resolved = pattern.resolve("sub/module-a");
        assert_eq!(resolved.to_string(), "glob:sub/module-a/**/*.java");
    }

    #[test]
    fn test_resolve_no_double_separator_for_absolute_body() {
        let pattern = PathPattern::parse("glob:/src/**");
        let resolved = pattern.resolve("module-a");
        assert_eq!(resolved.to_string(), "glob:module-a/src/**");
    }

    #[test]
    fn test_resolve_root_module_returns_pattern_unchanged() {
        let pattern = PathPattern::parse("glob:**/*.java");
        let resolved = pattern.resolve("");
        assert_eq!(resolved, pattern);
    }

    #[test]
    fn test_resolve_empty_body_passes_through() {
        // No semantic validation: composition only.
        let pattern = PathPattern::parse("");
        let resolved = pattern.resolve("module-a");
        assert_eq!(resolved.to_string(), "module-a/");
    }

    #[test]
    fn test_glob_matcher_matches_nested_files() {
        let matcher = PathPattern::parse("glob:**/*.java").compile().unwrap();
        assert!(matcher.is_match(&PathBuf::from("src/main/Foo.java")));
        assert!(!matcher.is_match(&PathBuf::from("src/main/Foo.rs")));
    }

    #[test]
    fn test_regex_matcher() {
        let matcher = PathPattern::parse("regex:.*\\.java$").compile().unwrap();
        assert!(matcher.is_match(&PathBuf::from("a/b/C.java")));
        assert!(!matcher.is_match(&PathBuf::from("a/b/C.javax")));
    }

    #[test]
    fn test_literal_matcher_exact_path() {
        let matcher = PathPattern::parse("src/main.rs").compile().unwrap();
        assert!(matcher.is_match(&PathBuf::from("src/main.rs")));
        assert!(!matcher.is_match(&PathBuf::from("src/lib.rs")));
    }

    #[test]
    fn test_invalid_regex_reports_pattern() {
        let err = PathPattern::parse("regex:[").compile().unwrap_err();
        assert!(err.to_string().contains("regex:["));
    }

    #[test]
    fn test_name_prefix_defaults_to_module_name_with_dot() {
        assert_eq!(resolve_name_prefix(None, "module-a"), "module-a.");
        assert_eq!(resolve_name_prefix(Some(""), "module-a"), "module-a.");
    }

    #[test]
    fn test_explicit_name_prefix_taken_verbatim() {
        // Deliberately not normalized: no dot is appended to explicit values.
        assert_eq!(resolve_name_prefix(Some("custom"), "module-a"), "custom");
        assert_eq!(resolve_name_prefix(Some("custom."), "module-a"), "custom.");
    }

    #[test]
    fn test_serde_round_trip_keeps_prefixed_form() {
        let pattern = PathPattern::parse("glob:**/*.rs");
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, "\"glob:**/*.rs\"");
        let back: PathPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
