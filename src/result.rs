//! Test results and their ingestion from CI captures.
//!
//! A result pairs a concrete test query with the environment tags it ran
//! under and the outcome status. Remote captures arrive as JSON; statuses
//! outside the closed set map to `Unknown` rather than failing ingestion.

use crate::query::{MalformedQuery, Query};
use crate::tags::{TagSet, TagSetList};
use serde::Deserialize;
use std::fmt;

/// Outcome of a single test run. The set is closed; anything a remote
/// source reports outside it becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Pass,
    Failure,
    Crash,
    Abort,
    Skip,
    Slow,
    RetryOnFailure,
    Unknown,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Pass,
        Status::Failure,
        Status::Crash,
        Status::Abort,
        Status::Skip,
        Status::Slow,
        Status::RetryOnFailure,
        Status::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Status::Pass => "Pass",
            Status::Failure => "Failure",
            Status::Crash => "Crash",
            Status::Abort => "Abort",
            Status::Skip => "Skip",
            Status::Slow => "Slow",
            Status::RetryOnFailure => "RetryOnFailure",
            Status::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Status> {
        Status::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Map a remote capture's status token. Unrecognized tokens are kept
    /// as `Unknown` so one odd bot doesn't sink the whole roll.
    pub fn from_remote(token: &str) -> Status {
        match token {
            "PASS" => Status::Pass,
            "FAIL" => Status::Failure,
            "CRASH" => Status::Crash,
            "ABORT" => Status::Abort,
            "SKIP" => Status::Skip,
            "SLOW" => Status::Slow,
            "RETRY_ON_FAILURE" => Status::RetryOnFailure,
            _ => Status::Unknown,
        }
    }

    // Severity used to collapse duplicate results on one (query, tags)
    // pair: Crash > Abort > Failure > Slow > everything else.
    fn merge_severity(self) -> u8 {
        match self {
            Status::Crash => 4,
            Status::Abort => 3,
            Status::Failure => 2,
            Status::Slow => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One test outcome from one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub query: Query,
    pub tags: TagSet,
    pub status: Status,
    pub duration_ms: u64,
    pub may_exonerate: bool,
}

/// Sort by (query, tags) and collapse duplicates, keeping the most
/// severe status per pair.
pub fn sort_and_dedup(mut results: Vec<TestResult>) -> Vec<TestResult> {
    results.sort_by(|a, b| {
        a.query
            .cmp(&b.query)
            .then_with(|| a.tags.cmp(&b.tags))
            .then_with(|| b.status.merge_severity().cmp(&a.status.merge_severity()))
            .then_with(|| a.status.cmp(&b.status))
    });
    results.dedup_by(|next, kept| next.query == kept.query && next.tags == kept.tags);
    results
}

/// On-wire record for one result in a CI capture.
#[derive(Debug, Deserialize)]
pub struct ResultRecord {
    pub test: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub may_exonerate: bool,
}

/// Materialize a capture: parse queries, scrub `remove` tags, drop tags
/// no header group declares, then sort and de-duplicate.
pub fn load_results(
    records: Vec<ResultRecord>,
    tag_sets: &TagSetList,
    remove: &TagSet,
) -> Result<Vec<TestResult>, MalformedQuery> {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let query = Query::parse(&record.test)?;
        let mut tags: TagSet = record.tags.into_iter().collect();
        tags.remove_all(remove);
        let tags = tag_sets.retain_known(&tags);
        results.push(TestResult {
            query,
            tags,
            status: Status::from_remote(&record.status),
            duration_ms: record.duration_ms,
            may_exonerate: record.may_exonerate,
        });
    }
    Ok(sort_and_dedup(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(query: &str, status: Status) -> TestResult {
        TestResult {
            query: Query::parse(query).expect("parse query"),
            tags: ["os-a"].into_iter().collect(),
            status,
            duration_ms: 0,
            may_exonerate: false,
        }
    }

    #[test]
    fn maps_remote_statuses() {
        assert_eq!(Status::from_remote("PASS"), Status::Pass);
        assert_eq!(Status::from_remote("FAIL"), Status::Failure);
        assert_eq!(Status::from_remote("CRASH"), Status::Crash);
        assert_eq!(Status::from_remote("ABORT"), Status::Abort);
        assert_eq!(Status::from_remote("SKIP"), Status::Skip);
        assert_eq!(Status::from_remote("TIMEOUT"), Status::Unknown);
    }

    #[test]
    fn status_names_round_trip() {
        for status in Status::ALL {
            assert_eq!(Status::from_name(status.name()), Some(status));
        }
        assert_eq!(Status::from_name("Flaky"), None);
    }

    #[test]
    fn dedup_keeps_most_severe_status() {
        let deduped = sort_and_dedup(vec![
            result("a:b:", Status::Failure),
            result("a:b:", Status::Crash),
            result("a:b:", Status::Pass),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].status, Status::Crash);
    }

    #[test]
    fn dedup_prefers_abort_over_failure_and_slow() {
        let deduped = sort_and_dedup(vec![
            result("a:b:", Status::Slow),
            result("a:b:", Status::Abort),
            result("a:b:", Status::Failure),
        ]);
        assert_eq!(deduped[0].status, Status::Abort);
    }

    #[test]
    fn dedup_is_keyed_on_query_and_tags() {
        let mut other = result("a:b:", Status::Failure);
        other.tags = ["os-b"].into_iter().collect();
        let deduped = sort_and_dedup(vec![result("a:b:", Status::Pass), other]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn load_results_scrubs_and_filters_tags() {
        let tag_sets = TagSetList::new(vec![vec!["os-a".into(), "os-b".into()]]).unwrap();
        let remove: TagSet = ["flaky-bot"].into_iter().collect();
        let records = vec![ResultRecord {
            test: "a:b:c:".into(),
            tags: vec!["os-a".into(), "flaky-bot".into(), "undeclared".into()],
            status: "FAIL".into(),
            duration_ms: 1200,
            may_exonerate: false,
        }];
        let results = load_results(records, &tag_sets, &remove).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tags, ["os-a"].into_iter().collect());
        assert_eq!(results[0].status, Status::Failure);
    }

    #[test]
    fn load_results_rejects_malformed_query() {
        let tag_sets = TagSetList::new(vec![]).unwrap();
        let records = vec![ResultRecord {
            test: "a:*:b".into(),
            tags: vec![],
            status: "PASS".into(),
            duration_ms: 0,
            may_exonerate: false,
        }];
        assert!(load_results(records, &tag_sets, &TagSet::new()).is_err());
    }
}
