//! The listing of tests known to the suite.
//!
//! The updater consults this to tell "expectation matched nothing because
//! the test was not run" apart from "expectation names a test that no
//! longer exists".

use crate::query::{MalformedQuery, Query};

#[derive(Debug, Clone, Default)]
pub struct TestList {
    queries: Vec<Query>,
}

impl TestList {
    /// Parse a newline-delimited listing of test ids. Blank lines and
    /// `#` comment lines are skipped; bare test ids are canonicalized
    /// with a trailing `:`.
    pub fn parse(text: &str) -> Result<TestList, MalformedQuery> {
        let mut queries = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            queries.push(Query::parse(trimmed)?.canonicalize_test_id());
        }
        queries.sort();
        queries.dedup();
        Ok(TestList { queries })
    }

    pub fn from_queries(queries: Vec<Query>) -> TestList {
        let mut queries: Vec<Query> = queries
            .into_iter()
            .map(Query::canonicalize_test_id)
            .collect();
        queries.sort();
        queries.dedup();
        TestList { queries }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// True iff any known test lies under `query`.
    pub fn any_within(&self, query: &Query) -> bool {
        self.queries.iter().any(|t| query.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(text: &str) -> Query {
        Query::parse(text).expect("parse query")
    }

    #[test]
    fn parses_listing_with_comments_and_blanks() {
        let list = TestList::parse("# suite listing\n\na:b,c:test_one\na:b,c:test_two:\n").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.any_within(&q("a:b,c:test_one:")));
    }

    #[test]
    fn canonicalizes_bare_test_ids() {
        let list = TestList::parse("a:b:t\n").unwrap();
        assert!(list.any_within(&q("a:b:t:")));
        assert!(!list.any_within(&q("a:b:t:case;*")));
    }

    #[test]
    fn any_within_respects_wildcards() {
        let list = TestList::parse("a:b,c:d\na:b,e:f\n").unwrap();
        assert!(list.any_within(&q("a:b,c:*")));
        assert!(list.any_within(&q("a:*")));
        assert!(!list.any_within(&q("a:x:*")));
    }
}
