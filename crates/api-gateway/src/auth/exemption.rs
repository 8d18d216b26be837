//! Path patterns and the authentication exemption matcher.
//!
//! Patterns are slash-separated and anchored at both ends:
//!
//! - a literal segment matches the same segment, case-sensitively
//! - `*` matches exactly one non-empty segment
//! - `**` matches zero or more trailing segments and must be the last segment
//!
//! Matching is always whole-path. `/api/account/member/register` does not
//! exempt `/api/account/member/registerOther`.
//!
//! Paths are matched as received. A path that an upstream URL parser would
//! rewrite (dot segments, encoded separators) is never exempt, see
//! [`is_normalized`].

use std::fmt;
use thiserror::Error;

/// Errors raised when a pattern string cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern must not be empty")]
    Empty,

    #[error("path pattern must start with '/': {0}")]
    NotAbsolute(String),

    #[error("'**' is only allowed as the last segment: {0}")]
    MisplacedTrailingWildcard(String),

    #[error("wildcards must occupy a whole segment: {0}")]
    PartialWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Trailing,
}

/// A compiled path pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PathPattern {
    /// Compile a pattern such as `/api/auth/**` or `/api/*/health`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if i == last => Segment::Trailing,
                "**" => return Err(PatternError::MisplacedTrailingWildcard(raw.to_string())),
                "*" => Segment::Single,
                p if p.contains('*') => return Err(PatternError::PartialWildcard(raw.to_string())),
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as it was configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the whole `path` matches this pattern.
    ///
    /// `path` must not carry a query string. Paths that do not start with
    /// `/` never match.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };

        let mut path_segments = rest.split('/');
        for segment in &self.segments {
            match segment {
                Segment::Trailing => return true,
                Segment::Single => match path_segments.next() {
                    Some(p) if !p.is_empty() => {}
                    _ => return false,
                },
                Segment::Literal(lit) => match path_segments.next() {
                    Some(p) if p == lit => {}
                    _ => return false,
                },
            }
        }

        path_segments.next().is_none()
    }
}

/// Whether `path` is already in the form it will be forwarded in.
///
/// Rejects `.` and `..` segments, including percent-encoded dots in any case
/// (`%2e`, `.%2E`), encoded slashes (`%2f`, `%5c`) and backslashes. Those are
/// resolved by URL parsing after the exemption check, so the forwarded path
/// could differ from the one that was matched.
pub fn is_normalized(path: &str) -> bool {
    if !path.starts_with('/') || path.contains('\\') {
        return false;
    }

    path.split('/').all(|segment| {
        let segment = segment.to_ascii_lowercase();
        if segment.contains("%2f") || segment.contains("%5c") {
            return false;
        }
        let decoded = segment.replace("%2e", ".");
        decoded != "." && decoded != ".."
    })
}

/// Decides whether a request path requires authentication.
///
/// Holds the exemption rules configured at startup. Immutable afterwards, so
/// a single instance is shared by every request.
#[derive(Debug, Clone, Default)]
pub struct ExemptionMatcher {
    rules: Vec<PathPattern>,
}

impl ExemptionMatcher {
    pub fn new(rules: Vec<PathPattern>) -> Self {
        Self { rules }
    }

    /// Compile every pattern, failing on the first invalid one.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let rules = patterns
            .iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// `true` unless at least one exemption rule matches `path`.
    ///
    /// A path that is not [normalized](is_normalized) is always secured.
    pub fn is_secured(&self, path: &str) -> bool {
        !is_normalized(path) || !self.rules.iter().any(|rule| rule.matches(path))
    }

    pub fn rules(&self) -> &[PathPattern] {
        &self.rules
    }
}
