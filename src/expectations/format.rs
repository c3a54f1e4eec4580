//! Canonical serialization of an expectations document.
//!
//! Chunks keep their source order; inside a chunk, expectations sort by
//! bug, then tag-group priority, then query. The header and every
//! comment line pass through verbatim; blank lines collapse to exactly
//! one between chunks.

use super::{Content, Expectation};
use crate::tags::TagSetList;
use std::cmp::Ordering;

pub fn format(content: &Content) -> String {
    let mut out = String::new();
    for line in &content.header {
        out.push_str(line);
        out.push('\n');
    }

    for chunk in &content.chunks {
        if chunk.is_empty() {
            continue;
        }
        out.push('\n');
        for comment in &chunk.comments {
            out.push_str(comment);
            out.push('\n');
        }
        let mut expectations = chunk.expectations.clone();
        sort_expectations(&mut expectations, &content.tag_sets);
        for expectation in &expectations {
            out.push_str(&serialize_expectation(expectation, &content.tag_sets));
            out.push('\n');
        }
    }
    out
}

pub(crate) fn sort_expectations(expectations: &mut [Expectation], tag_sets: &TagSetList) {
    expectations.sort_by(|a, b| compare(a, b, tag_sets));
}

fn compare(a: &Expectation, b: &Expectation, tag_sets: &TagSetList) -> Ordering {
    // Missing bugs sort after every present bug.
    let bug = (a.bug.is_none(), &a.bug).cmp(&(b.bug.is_none(), &b.bug));
    bug.then_with(|| group_indices(a, tag_sets).cmp(&group_indices(b, tag_sets)))
        .then_with(|| a.query.cmp(&b.query))
}

// For each declared group, the in-group index of the expectation's tag
// in that group; an absent group sorts first.
fn group_indices(expectation: &Expectation, tag_sets: &TagSetList) -> Vec<Option<usize>> {
    let mut indices = vec![None; tag_sets.group_count()];
    for tag in expectation.tags.iter() {
        if let Some((group, index)) = tag_sets.position(tag) {
            let slot = &mut indices[group];
            if slot.map(|existing| index < existing).unwrap_or(true) {
                *slot = Some(index);
            }
        }
    }
    indices
}

pub(crate) fn serialize_expectation(expectation: &Expectation, tag_sets: &TagSetList) -> String {
    let mut out = String::new();
    if let Some(bug) = &expectation.bug {
        out.push_str(bug);
        out.push(' ');
    }

    if !expectation.tags.is_empty() {
        let mut tags: Vec<&str> = expectation.tags.iter().collect();
        tags.sort_by_key(|tag| match tag_sets.position(tag) {
            Some((group, index)) => (group, index, *tag),
            None => (usize::MAX, 0, *tag),
        });
        out.push_str("[ ");
        for tag in tags {
            out.push_str(tag);
            out.push(' ');
        }
        out.push_str("] ");
    }

    out.push_str(&expectation.query.to_string());

    let mut statuses = expectation.statuses.clone();
    statuses.sort();
    statuses.dedup();
    out.push_str(" [ ");
    for status in statuses {
        out.push_str(status.name());
        out.push(' ');
    }
    out.push(']');

    if let Some(comment) = &expectation.comment {
        out.push(' ');
        out.push_str(comment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    const SCRAMBLED: &str = "\
# BEGIN TAG HEADER
# OS
# tags: [ os-a os-b os-c ]
# GPU
# tags: [ gpu-a gpu-b ]
# END TAG HEADER

# Suppressions.
crbug.com/b/9 a:z:* [ Failure ]
a:a:* [ Failure ]
crbug.com/a/1 [ os-b ] a:m:* [ Failure ]

crbug.com/a/1 [ os-a gpu-b ] a:q:* [ Failure ]
crbug.com/a/1 [ os-a ] a:p:* [ Failure ]
crbug.com/a/1 [ os-a ] a:p:x,* [ Failure ]
";

    #[test]
    fn orders_by_bug_then_tag_groups_then_query() {
        let content = parse(SCRAMBLED).unwrap();
        let formatted = format(&content);
        let expected = "\
# BEGIN TAG HEADER
# OS
# tags: [ os-a os-b os-c ]
# GPU
# tags: [ gpu-a gpu-b ]
# END TAG HEADER

# Suppressions.
crbug.com/a/1 [ os-b ] a:m:* [ Failure ]
crbug.com/b/9 a:z:* [ Failure ]
a:a:* [ Failure ]

crbug.com/a/1 [ os-a ] a:p:* [ Failure ]
crbug.com/a/1 [ os-a ] a:p:x,* [ Failure ]
crbug.com/a/1 [ os-a gpu-b ] a:q:* [ Failure ]
";
        assert_eq!(formatted, expected);
    }

    #[test]
    fn formatting_is_idempotent_on_the_model() {
        let content = parse(SCRAMBLED).unwrap();
        let once = format(&content);
        let reparsed = parse(&once).unwrap();
        assert_eq!(format(&reparsed), once);

        // The abstract models agree once source line numbers are erased.
        let erase = |mut c: Content| {
            let tag_sets = c.tag_sets.clone();
            for chunk in &mut c.chunks {
                sort_expectations(&mut chunk.expectations, &tag_sets);
                for e in &mut chunk.expectations {
                    e.line = 0;
                }
            }
            c
        };
        assert_eq!(erase(reparsed), erase(content));
    }

    #[test]
    fn serializes_tags_in_group_priority_order() {
        let content = parse(SCRAMBLED).unwrap();
        let e = content
            .chunks
            .iter()
            .flat_map(|c| &c.expectations)
            .find(|e| e.query.to_string() == "a:q:*")
            .unwrap();
        assert_eq!(
            serialize_expectation(e, &content.tag_sets),
            "crbug.com/a/1 [ os-a gpu-b ] a:q:* [ Failure ]"
        );
    }

    #[test]
    fn serializes_statuses_in_canonical_order() {
        let content =
            parse("# tags: [ os-a ]\n\na:b: [ Slow Failure Failure ]\n").unwrap();
        let e = &content.chunks[0].expectations[0];
        assert_eq!(
            serialize_expectation(e, &content.tag_sets),
            "a:b: [ Failure Slow ]"
        );
    }

    #[test]
    fn comments_survive_formatting() {
        let doc = "# tags: [ os-a ]\n\n# keep me\na:b: [ Failure ]  # trailing note\n";
        let content = parse(doc).unwrap();
        let formatted = format(&content);
        assert!(formatted.contains("# keep me\n"));
        assert!(formatted.contains("a:b: [ Failure ] # trailing note\n"));
    }
}
