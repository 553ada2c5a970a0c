//! Request matchers
//!
//! [`MatcherSpec`] is the serializable description; [`Matcher`] is the
//! compiled predicate. Matching is pure: it only reads the request.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{Destination, Request};

/// Serializable matcher description, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherSpec {
    /// URL matches a regular expression
    Regex { pattern: String },
    /// Top-level navigation, optionally narrowed by URL allow/deny patterns
    Navigation {
        #[serde(default)]
        allow: Vec<String>,
        #[serde(default)]
        deny: Vec<String>,
    },
    /// Request destination equals the given kind
    Destination { destination: Destination },
    /// Any of the nested matchers
    AnyOf { matchers: Vec<MatcherSpec> },
}

impl MatcherSpec {
    pub fn regex(pattern: impl Into<String>) -> Self {
        MatcherSpec::Regex {
            pattern: pattern.into(),
        }
    }

    /// Compiles every pattern, failing on the first invalid one.
    pub fn compile(&self) -> Result<Matcher> {
        Ok(match self {
            MatcherSpec::Regex { pattern } => Matcher::Regex(compile_pattern(pattern)?),
            MatcherSpec::Navigation { allow, deny } => Matcher::Navigation {
                allow: compile_patterns(allow)?,
                deny: compile_patterns(deny)?,
            },
            MatcherSpec::Destination { destination } => Matcher::Destination(*destination),
            MatcherSpec::AnyOf { matchers } => Matcher::AnyOf(
                matchers
                    .iter()
                    .map(MatcherSpec::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

/// Compiled request predicate.
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),
    Navigation { allow: Vec<Regex>, deny: Vec<Regex> },
    Destination(Destination),
    AnyOf(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::Regex(regex) => regex.is_match(&request.url),
            Matcher::Navigation { allow, deny } => {
                request.is_navigation()
                    && (allow.is_empty() || allow.iter().any(|re| re.is_match(&request.url)))
                    && !deny.iter().any(|re| re.is_match(&request.url))
            }
            Matcher::Destination(destination) => request.destination == *destination,
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(request)),
        }
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| EngineError::InvalidConfig(format!("invalid pattern {pattern:?}: {e}")))
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_matcher() {
        let matcher = MatcherSpec::regex(r"/images/app/").compile().unwrap();
        assert!(matcher.matches(&Request::get("https://app.test/images/app/logo.png")));
        assert!(!matcher.matches(&Request::get("https://app.test/images/user/1.png")));
    }

    #[test]
    fn test_navigation_allow_deny() {
        let matcher = MatcherSpec::Navigation {
            allow: vec![],
            deny: vec![r"/logout".to_string()],
        }
        .compile()
        .unwrap();

        assert!(matcher.matches(&Request::navigate("https://app.test/dashboard")));
        assert!(!matcher.matches(&Request::navigate("https://app.test/logout")));
        assert!(!matcher.matches(&Request::get("https://app.test/dashboard")));
    }

    #[test]
    fn test_any_of_and_destination() {
        let matcher = MatcherSpec::AnyOf {
            matchers: vec![
                MatcherSpec::Destination {
                    destination: Destination::Font,
                },
                MatcherSpec::regex(r"\.woff2$"),
            ],
        }
        .compile()
        .unwrap();

        let font = Request::new("https://cdn.test/x", "GET", Destination::Font);
        assert!(matcher.matches(&font));
        assert!(matcher.matches(&Request::get("https://cdn.test/f.woff2")));
        assert!(!matcher.matches(&Request::get("https://cdn.test/f.css")));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = MatcherSpec::regex("(unclosed").compile().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_deserialize_tagged() {
        let spec: MatcherSpec = serde_json::from_str(
            r#"{"kind":"any_of","matchers":[{"kind":"regex","pattern":"^https://api\\."},{"kind":"navigation"}]}"#,
        )
        .unwrap();
        match spec {
            MatcherSpec::AnyOf { matchers } => {
                assert_eq!(matchers.len(), 2);
                assert_eq!(
                    matchers[1],
                    MatcherSpec::Navigation {
                        allow: vec![],
                        deny: vec![]
                    }
                );
            }
            other => panic!("unexpected matcher: {other:?}"),
        }
    }
}
