//! The expectations document: header, chunks, and expectation lines.
//!
//! A document is a tag header followed by blank-line-separated chunks.
//! Chunks are immutable by default; magic comment sentinels opt a chunk
//! into rewriting, and two reserved chunks collect newly-discovered
//! failures and flakes.

use crate::query::Query;
use crate::result::{Status, TestResult};
use crate::tags::{TagSet, TagSetList};

mod format;
mod parse;
mod update;

pub use format::format;
pub use parse::{parse, ParseError};
pub use update::update;

/// Sentinel marking a chunk the updater may rewrite in place.
pub const ROLLER_MUTABLE: &str = "##ROLLER_MUTABLE##";
/// Sentinel marking a chunk the updater empties and regenerates.
pub const ROLLER_DISCARD_AND_REWRITE: &str = "##ROLLER_DISCARD_AND_REWRITE##";
/// Title substring of the reserved chunk for newly failing tests.
pub const NEW_FAILURES_TITLE: &str = "New failures";
/// Title substring of the reserved chunk for newly flaking tests.
pub const NEW_FLAKES_TITLE: &str = "New flakes";

/// Bug filed against every synthesized expectation until triage.
pub const PLACEHOLDER_BUG: &str = "crbug.com/dawn/0000";

const SECTION_RULE: &str =
    "################################################################################";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    Mutable,
    DiscardAndRewrite,
}

/// One expectation line: an optional bug, environment tags, a query, the
/// statuses the matched tests are expected to produce, and an optional
/// trailing comment. `line` is the 1-based source line (0 when
/// synthesized), carried for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub line: usize,
    pub bug: Option<String>,
    pub tags: TagSet,
    pub query: Query,
    pub statuses: Vec<Status>,
    pub comment: Option<String>,
}

/// A run of comment and expectation lines, separated from its neighbors
/// by blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub comments: Vec<String>,
    pub expectations: Vec<Expectation>,
}

impl Chunk {
    pub fn mutability(&self) -> Mutability {
        if self.has_title(NEW_FAILURES_TITLE)
            || self.has_title(NEW_FLAKES_TITLE)
            || self.comments_contain(ROLLER_DISCARD_AND_REWRITE)
        {
            Mutability::DiscardAndRewrite
        } else if self.comments_contain(ROLLER_MUTABLE) {
            Mutability::Mutable
        } else {
            Mutability::Immutable
        }
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.comments_contain(title)
    }

    fn comments_contain(&self, needle: &str) -> bool {
        self.comments.iter().any(|c| c.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.expectations.is_empty()
    }
}

/// The parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// Header lines, emitted verbatim.
    pub header: Vec<String>,
    pub tag_sets: TagSetList,
    pub chunks: Vec<Chunk>,
}

impl Content {
    pub fn parse(text: &str) -> Result<Content, ParseError> {
        parse::parse(text)
    }

    pub fn format(&self) -> String {
        format::format(self)
    }

    /// The reserved chunk whose title contains `title`, created at the
    /// end of the document if absent.
    pub(crate) fn reserved_chunk_mut(&mut self, title: &str) -> &mut Chunk {
        if let Some(idx) = self.chunks.iter().position(|c| c.has_title(title)) {
            return &mut self.chunks[idx];
        }
        self.chunks.push(Chunk {
            comments: vec![
                SECTION_RULE.to_string(),
                format!("# {title}. Please triage:"),
                SECTION_RULE.to_string(),
            ],
            expectations: Vec::new(),
        });
        self.chunks.last_mut().expect("chunk just pushed")
    }
}

/// Map results 1-to-1 into expectations: one line per unique
/// (priority-reduced tags, query) pair, tagged with `bug` and `comment`.
/// Concrete test ids gain their canonical trailing `:`; duplicates from
/// the reduction collapse, merging statuses.
pub fn results_to_expectations(
    results: &[TestResult],
    tag_sets: &TagSetList,
    bug: &str,
    comment: Option<&str>,
) -> Vec<Expectation> {
    use std::collections::BTreeMap;

    let mut grouped: BTreeMap<(TagSet, Query), Vec<Status>> = BTreeMap::new();
    for result in results {
        let tags = tag_sets.reduce(&result.tags);
        let query = result.query.clone().canonicalize_test_id();
        let statuses = grouped.entry((tags, query)).or_default();
        if !statuses.contains(&result.status) {
            statuses.push(result.status);
        }
    }

    let mut expectations: Vec<Expectation> = grouped
        .into_iter()
        .map(|((tags, query), statuses)| Expectation {
            line: 0,
            bug: Some(bug.to_string()),
            tags,
            query,
            statuses,
            comment: comment.map(str::to_string),
        })
        .collect();
    format::sort_expectations(&mut expectations, tag_sets);
    expectations
}
