//! Hierarchical test queries.
//!
//! A query names a point in the test hierarchy: `:`-separated segments,
//! with `,` splitting directory-like sub-segments and `;` splitting case
//! parameters. A trailing `*` makes the query a wildcard covering every
//! descendant that shares the prefix.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A test id failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed query {query:?}: {reason}")]
pub struct MalformedQuery {
    pub query: String,
    pub reason: &'static str,
}

/// Separator preceding a segment in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Separator {
    Comma,
    Colon,
    Semicolon,
}

impl Separator {
    fn as_char(self) -> char {
        match self {
            Separator::Comma => ',',
            Separator::Colon => ':',
            Separator::Semicolon => ';',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            ',' => Some(Separator::Comma),
            ':' => Some(Separator::Colon),
            ';' => Some(Separator::Semicolon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    // The separator that preceded this segment. Normalized to Colon for
    // the first segment, which has none in the source text.
    sep: Separator,
    text: String,
}

/// A parsed test query. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    segments: Vec<Segment>,
    // Concrete queries carry None. Wildcards remember the separator that
    // preceded the `*` so the source form round-trips.
    wildcard: Option<Separator>,
}

impl Query {
    pub fn parse(text: &str) -> Result<Query, MalformedQuery> {
        let malformed = |reason| MalformedQuery {
            query: text.to_string(),
            reason,
        };
        if text.is_empty() {
            return Err(malformed("query is empty"));
        }

        let mut segments = Vec::new();
        let mut wildcard = None;
        let mut sep = Separator::Colon;
        let mut current = String::new();
        let mut chars = text.chars().peekable();
        loop {
            match chars.next() {
                Some('*') => {
                    if !current.is_empty() || chars.peek().is_some() {
                        return Err(malformed("`*` must terminate the query"));
                    }
                    wildcard = Some(sep);
                    break;
                }
                Some(c) => {
                    if let Some(next_sep) = Separator::from_char(c) {
                        segments.push(Segment {
                            sep,
                            text: std::mem::take(&mut current),
                        });
                        sep = next_sep;
                    } else {
                        current.push(c);
                    }
                }
                None => {
                    segments.push(Segment { sep, text: current });
                    break;
                }
            }
        }

        // Only the final segment may be empty: `a:b:` is the canonical
        // form of a bare test id, while `a::b` is a syntax error.
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if segment.text.is_empty() {
                return Err(malformed("query contains an empty segment"));
            }
        }
        if wildcard.is_some() {
            if let Some(last) = segments.last() {
                if last.text.is_empty() {
                    return Err(malformed("query contains an empty segment"));
                }
            }
        }

        Ok(Query { segments, wildcard })
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    /// Number of segments in the concrete prefix.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segment texts of the concrete prefix, paired with the
    /// separator that precedes each.
    pub(crate) fn raw_segments(&self) -> impl Iterator<Item = (Separator, &str)> {
        self.segments.iter().map(|s| (s.sep, s.text.as_str()))
    }

    /// True iff `self` covers `other`: either the two are equal, or
    /// `self` is a wildcard whose segments prefix `other`'s at segment
    /// boundaries.
    pub fn contains(&self, other: &Query) -> bool {
        if self.wildcard.is_none() {
            return self == other;
        }
        if other.segments.len() < self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&other.segments)
            .enumerate()
            .all(|(i, (a, b))| a.text == b.text && (i == 0 || a.sep == b.sep))
    }

    /// The deepest wildcard query containing both `a` and `b`.
    pub fn common_ancestor(a: &Query, b: &Query) -> Query {
        let mut shared = Vec::new();
        for (i, (sa, sb)) in a.segments.iter().zip(&b.segments).enumerate() {
            if sa.text != sb.text || (i > 0 && sa.sep != sb.sep) {
                break;
            }
            shared.push(sa.clone());
        }
        let sep = a
            .segments
            .get(shared.len())
            .map(|s| s.sep)
            .unwrap_or(Separator::Colon);
        Query {
            segments: shared,
            wildcard: Some(sep),
        }
    }

    /// Rebuild a wildcard query from a segment path. Used when the
    /// query tree collapses a subtree into its parent; `wildcard_sep` is
    /// the separator the collapsed children were reached through.
    pub(crate) fn from_path(path: &[(Separator, String)], wildcard_sep: Separator) -> Query {
        Query {
            segments: path
                .iter()
                .map(|(sep, text)| Segment {
                    sep: *sep,
                    text: text.clone(),
                })
                .collect(),
            wildcard: Some(wildcard_sep),
        }
    }

    /// Canonicalize a bare test id by appending `:`. Only callers that
    /// know the query names a test (rather than a file or case prefix)
    /// should use this; wildcard queries pass through untouched.
    pub fn canonicalize_test_id(mut self) -> Query {
        let ends_open = self
            .segments
            .last()
            .map(|s| !s.text.is_empty())
            .unwrap_or(false);
        if self.wildcard.is_none() && ends_open {
            self.segments.push(Segment {
                sep: Separator::Colon,
                text: String::new(),
            });
        }
        self
    }
}

impl Ord for Query {
    fn cmp(&self, other: &Query) -> Ordering {
        let mut i = 0;
        loop {
            match (self.segments.get(i), other.segments.get(i)) {
                (Some(a), Some(b)) => {
                    let ord = a.text.cmp(&b.text).then_with(|| {
                        if i == 0 {
                            Ordering::Equal
                        } else {
                            a.sep.cmp(&b.sep)
                        }
                    });
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                // A wildcard sorts before everything under it; a shorter
                // concrete query sorts before its extensions.
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (None, None) => {
                    return other
                        .is_wildcard()
                        .cmp(&self.is_wildcard())
                        .then(self.wildcard.cmp(&other.wildcard));
                }
            }
            i += 1;
        }
    }
}

impl PartialOrd for Query {
    fn partial_cmp(&self, other: &Query) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(&segment.sep.as_char().to_string())?;
            }
            f.write_str(&segment.text)?;
        }
        if let Some(sep) = self.wildcard {
            if !self.segments.is_empty() {
                f.write_str(&sep.as_char().to_string())?;
            }
            f.write_str("*")?;
        }
        Ok(())
    }
}
