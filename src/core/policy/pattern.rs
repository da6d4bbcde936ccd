//! Resource pattern matching for ACE scopes
//!
//! Supports wildcards:
//! - `*` - Matches any single path segment (e.g., `/people/*/mail`)
//! - `**` - Matches any number of path segments recursively (e.g., `/admin/**`)
//!
//! Patterns are compiled once when the policy is bound, so matching at
//! evaluation time never re-splits the pattern.

use crate::error::{PolicyError, Result};
use std::fmt;

/// One compiled path segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`
    One,
    /// `**`
    Any,
}

/// Compiled resource pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl ResourcePattern {
    /// Compile a pattern
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` for empty patterns, `***` segments,
    /// segments mixing `*` with literal text, or `.`/`..` segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use dsacl::policy::ResourcePattern;
    ///
    /// let pattern = ResourcePattern::new("/people/**").unwrap();
    /// assert!(pattern.matches("/people/alice/mail"));
    /// assert!(!pattern.matches("/groups/admins"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(PolicyError::InvalidPattern("pattern is empty".to_string()));
        }

        let mut segments = Vec::new();
        for part in split_segments(pattern) {
            let segment = match part {
                "." | ".." => {
                    return Err(PolicyError::InvalidPattern(format!(
                        "segment '{}' in '{}' is not allowed",
                        part, pattern
                    )));
                }
                "*" => Segment::One,
                "**" => Segment::Any,
                p if p.contains('*') => {
                    return Err(PolicyError::InvalidPattern(format!(
                        "segment '{}' in '{}' mixes wildcards with text",
                        p, pattern
                    )));
                }
                p => Segment::Literal(p.to_string()),
            };
            // Consecutive `**` collapse into one
            if segment == Segment::Any && segments.last() == Some(&Segment::Any) {
                continue;
            }
            segments.push(segment);
        }

        Ok(ResourcePattern {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written in the policy
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if a resource identifier matches this pattern
    ///
    /// `.` and `..` segments in the resource are resolved first, so
    /// `/public/../secret` is matched as `/secret`.
    pub fn matches(&self, resource: &str) -> bool {
        let path = resolve_segments(resource);
        Self::match_parts(&self.segments, &path)
    }

    /// Recursively match pattern segments against path segments
    fn match_parts(pattern: &[Segment], path: &[&str]) -> bool {
        match pattern.split_first() {
            None => path.is_empty(),
            Some((Segment::Any, rest)) => {
                // ** consumes 0, 1, 2, ... segments
                (0..=path.len()).any(|skip| Self::match_parts(rest, &path[skip..]))
            }
            Some((Segment::One, rest)) => {
                !path.is_empty() && Self::match_parts(rest, &path[1..])
            }
            Some((Segment::Literal(lit), rest)) => match path.split_first() {
                Some((first, tail)) if first == lit => Self::match_parts(rest, tail),
                _ => false,
            },
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path into non-empty segments, ignoring leading/trailing slashes
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Segments of `path` with `.` dropped and `..` popping its parent
fn resolve_segments(path: &str) -> Vec<&str> {
    let mut resolved = Vec::new();
    for part in split_segments(path) {
        match part {
            "." => {}
            ".." => {
                resolved.pop();
            }
            _ => resolved.push(part),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        ResourcePattern::new(pattern).unwrap().matches(path)
    }

    #[test]
    fn test_exact_match() {
        assert!(matches("/people/alice", "/people/alice"));
        assert!(!matches("/people/alice", "/people/bob"));
    }

    #[test]
    fn test_single_wildcard() {
        assert!(matches("/people/*", "/people/alice"));
        assert!(!matches("/people/*", "/people/alice/mail"));
        assert!(!matches("/people/*", "/groups/alice"));
    }

    #[test]
    fn test_recursive_wildcard() {
        assert!(matches("/admin/**", "/admin/users"));
        assert!(matches("/admin/**", "/admin/users/bob/profile"));
        assert!(matches("/admin/**", "/admin"));
        assert!(!matches("/admin/**", "/users/admin"));
    }

    #[test]
    fn test_mixed_wildcards() {
        assert!(matches("/people/*/mail", "/people/alice/mail"));
        assert!(!matches("/people/*/mail", "/people/alice/phone"));
        assert!(matches("/people/**/mail", "/people/eng/alice/mail"));
        assert!(matches("/people/**/mail", "/people/mail"));
    }

    #[test]
    fn test_normalization() {
        assert!(matches("/people/alice", "people/alice"));
        assert!(matches("people/alice/", "/people/alice"));
        assert!(matches("//people//alice", "/people/alice"));
    }

    #[test]
    fn test_dot_segments_resolved() {
        assert!(matches("/secret/**", "/public/../secret"));
        assert!(!matches("/public/**", "/public/../secret"));
        assert!(matches("/people/alice", "/people/./alice"));
        assert!(matches("/", "/../.."));
        assert!(matches("/secret", "/public/../../secret"));
    }

    #[test]
    fn test_root_path() {
        assert!(matches("/", "/"));
        assert!(matches("/*", "/anything"));
        assert!(!matches("/*", "/"));
        assert!(matches("/**", "/"));
        assert!(matches("/**", "/anything/nested"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(ResourcePattern::new("").is_err());
        assert!(ResourcePattern::new("   ").is_err());
        assert!(ResourcePattern::new("/people/a*").is_err());
        assert!(ResourcePattern::new("/people/***").is_err());
        assert!(ResourcePattern::new("/people/../secret").is_err());
        assert!(ResourcePattern::new("/./people").is_err());
    }
}
