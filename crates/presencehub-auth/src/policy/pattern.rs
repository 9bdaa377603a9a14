//! Segment-wise destination patterns.
//!
//! A destination is a `/`-separated path. Patterns use the same syntax plus
//! two wildcards that must occupy a whole segment:
//!
//! - `*` matches exactly one non-empty segment (`/topic/friends/*` matches
//!   `/topic/friends/42` but not `/topic/friends/42/x`)
//! - `**` matches zero or more segments (`/app/**` matches `/app`,
//!   `/app/im` and `/app/a/b/c`)

use std::fmt;

use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Any,
}

/// A compiled destination pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl DestinationPattern {
    /// Compiles a pattern, rejecting relative paths and partial-segment wildcards.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let Some(body) = raw.strip_prefix('/') else {
            return Err(AppError::validation(format!(
                "destination pattern must start with '/': {raw}"
            )));
        };

        let segments = body
            .split('/')
            .map(|segment| match segment {
                "*" => Ok(Segment::Single),
                "**" => Ok(Segment::Any),
                literal if literal.contains('*') => Err(AppError::validation(format!(
                    "wildcards must span a whole segment: {raw}"
                ))),
                literal => Ok(Segment::Literal(literal.to_string())),
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns true if `destination` is matched by this pattern.
    pub fn matches(&self, destination: &str) -> bool {
        match destination.strip_prefix('/') {
            Some(body) => {
                let parts: Vec<&str> = body.split('/').collect();
                match_segments(&self.segments, &parts)
            }
            None => false,
        }
    }

    /// True if the pattern contains no wildcard.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DestinationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// True if `destination` contains a wildcard segment and should be treated
/// as a pattern subscription.
pub fn has_wildcard(destination: &str) -> bool {
    destination.split('/').any(|s| s == "*" || s == "**")
}

fn match_segments(pattern: &[Segment], parts: &[&str]) -> bool {
    match pattern.split_first() {
        None => parts.is_empty(),
        Some((Segment::Any, rest)) => (0..=parts.len()).any(|i| match_segments(rest, &parts[i..])),
        Some((Segment::Single, rest)) => parts
            .split_first()
            .is_some_and(|(part, tail)| !part.is_empty() && match_segments(rest, tail)),
        Some((Segment::Literal(literal), rest)) => parts
            .split_first()
            .is_some_and(|(part, tail)| part == literal && match_segments(rest, tail)),
    }
}
