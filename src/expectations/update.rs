//! The expectation update engine.
//!
//! Consumes fresh results plus the listing of known tests, rewrites the
//! chunks the document allows it to touch, and collects newly failing or
//! flaking tests into the reserved chunks.

use super::{
    Content, Expectation, Mutability, NEW_FAILURES_TITLE, NEW_FLAKES_TITLE, PLACEHOLDER_BUG,
};
use crate::diagnostics::{self, Diagnostic};
use crate::query_tree::QueryTree;
use crate::result::{Status, TestResult};
use crate::tags::TagSet;
use crate::test_list::TestList;
use std::collections::BTreeMap;

struct Tracked<'a> {
    result: &'a TestResult,
    // The priority-reduced tag-set; the variant this result belongs to.
    variant: TagSet,
    consumed: bool,
}

/// Update `content` in place against `results`. Returned diagnostics are
/// in ascending source-line order; the caller must not persist the
/// document if any carries `Severity::Error`.
pub fn update(
    content: &mut Content,
    results: &[TestResult],
    test_list: &TestList,
    verbose: bool,
) -> Vec<Diagnostic> {
    let mut tracked: Vec<Tracked> = results
        .iter()
        .map(|result| Tracked {
            result,
            variant: content.tag_sets.reduce(&result.tags),
            consumed: false,
        })
        .collect();
    let mut diags = Vec::new();

    retain_or_drop_lines(content, &mut tracked, test_list, verbose, &mut diags);
    drop_covered_lines(content, &mut diags);
    route_leftovers(content, &tracked);

    diagnostics::sort(&mut diags);
    diags
}

// Walk every chunk in source order, dropping (where allowed) expectation
// lines that no longer describe reality, and marking the results that
// kept lines account for.
fn retain_or_drop_lines(
    content: &mut Content,
    tracked: &mut [Tracked],
    test_list: &TestList,
    verbose: bool,
    diags: &mut Vec<Diagnostic>,
) {
    for chunk in &mut content.chunks {
        let mutability = chunk.mutability();
        if mutability == Mutability::DiscardAndRewrite {
            chunk.expectations.clear();
            continue;
        }
        let mutable = mutability == Mutability::Mutable;

        let mut kept = Vec::with_capacity(chunk.expectations.len());
        for expectation in chunk.expectations.drain(..) {
            let matched: Vec<usize> = tracked
                .iter()
                .enumerate()
                .filter(|(_, t)| {
                    expectation.query.contains(&t.result.query)
                        && expectation.tags.is_subset(&t.variant)
                })
                .map(|(i, _)| i)
                .collect();

            if matched.is_empty() {
                if !test_list.any_within(&expectation.query) {
                    diags.push(Diagnostic::warning(
                        expectation.line,
                        format!(
                            "no tests exist with query '{}' - removing",
                            expectation.query
                        ),
                    ));
                    if mutable {
                        continue;
                    }
                } else if verbose {
                    let suffix = if expectation.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" with tags [ {} ]", expectation.tags)
                    };
                    diags.push(Diagnostic::note(
                        expectation.line,
                        format!("no results found for query '{}'{}", expectation.query, suffix),
                    ));
                }
                kept.push(expectation);
                continue;
            }

            if matched
                .iter()
                .all(|&i| tracked[i].result.status == Status::Pass)
            {
                let message = if matched.len() == 1 {
                    "test now passes".to_string()
                } else {
                    format!("all {} tests now pass", matched.len())
                };
                diags.push(Diagnostic::note(expectation.line, message));
                if mutable {
                    continue;
                }
                kept.push(expectation);
                continue;
            }

            for &i in &matched {
                tracked[i].consumed = true;
            }
            kept.push(expectation);
        }
        chunk.expectations = kept;
    }
}

// Within each mutable chunk, drop any expectation an earlier surviving
// expectation already covers: tag subset, containing query, and at least
// the same statuses.
fn drop_covered_lines(content: &mut Content, diags: &mut Vec<Diagnostic>) {
    for chunk in &mut content.chunks {
        if chunk.mutability() != Mutability::Mutable {
            continue;
        }
        let mut kept: Vec<Expectation> = Vec::with_capacity(chunk.expectations.len());
        for expectation in chunk.expectations.drain(..) {
            let covered = kept.iter().any(|prev| {
                prev.tags.is_subset(&expectation.tags)
                    && prev.query.contains(&expectation.query)
                    && expectation
                        .statuses
                        .iter()
                        .all(|s| prev.statuses.contains(s))
            });
            if covered {
                diags.push(Diagnostic::note(
                    expectation.line,
                    "expectation is fully covered by previous expectations",
                ));
                continue;
            }
            kept.push(expectation);
        }
        chunk.expectations = kept;
    }
}

// Results no surviving expectation accounts for become new expectation
// lines in the reserved chunks: hard failures in "New failures", retries
// in "New flakes". Passing results are the roll-up denominators and are
// otherwise discarded.
fn route_leftovers(content: &mut Content, tracked: &[Tracked]) {
    let mut by_variant: BTreeMap<&TagSet, Vec<(&TestResult, Status)>> = BTreeMap::new();
    for t in tracked {
        if t.consumed {
            continue;
        }
        by_variant
            .entry(&t.variant)
            .or_default()
            .push((t.result, effective_status(t.result)));
    }

    let failures = synthesize(&by_variant, is_hard_failure, map_failure_status);
    let flakes = synthesize(&by_variant, is_flake, |_| Status::RetryOnFailure);

    if !failures.is_empty() {
        content
            .reserved_chunk_mut(NEW_FAILURES_TITLE)
            .expectations
            .extend(failures);
    }
    if !flakes.is_empty() {
        content
            .reserved_chunk_mut(NEW_FLAKES_TITLE)
            .expectations
            .extend(flakes);
    }
}

// Results flagged may_exonerate demote one notch: an exonerable hard
// failure rolls as a flake instead.
fn effective_status(result: &TestResult) -> Status {
    if result.may_exonerate && result.status == Status::Failure {
        Status::RetryOnFailure
    } else {
        result.status
    }
}

fn is_hard_failure(status: Status) -> bool {
    matches!(
        status,
        Status::Failure | Status::Crash | Status::Abort | Status::Slow
    )
}

fn is_flake(status: Status) -> bool {
    status == Status::RetryOnFailure
}

fn map_failure_status(status: Status) -> Status {
    match status {
        Status::Crash | Status::Abort => Status::Failure,
        other => other,
    }
}

fn synthesize(
    by_variant: &BTreeMap<&TagSet, Vec<(&TestResult, Status)>>,
    in_category: fn(Status) -> bool,
    map_status: fn(Status) -> Status,
) -> Vec<Expectation> {
    let mut out = Vec::new();
    for (variant, results) in by_variant {
        if !results.iter().any(|(_, status)| in_category(*status)) {
            continue;
        }
        // Every result of the variant goes into the tree; the ones
        // outside the category act as passing denominators.
        let mut tree = QueryTree::new();
        for (result, status) in results {
            tree.insert(&result.query, *status);
        }
        for root in tree.roots(in_category) {
            let mut statuses: Vec<Status> =
                root.statuses.iter().copied().map(map_status).collect();
            statuses.sort();
            statuses.dedup();
            out.push(Expectation {
                line: 0,
                bug: Some(PLACEHOLDER_BUG.to_string()),
                tags: (*variant).clone(),
                query: root.query,
                statuses,
                comment: None,
            });
        }
    }
    out
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
