//! Line-oriented parser for the expectations file format.

use super::{Chunk, Content, Expectation};
use crate::query::{MalformedQuery, Query};
use crate::result::Status;
use crate::tags::{DuplicateTag, TagSetList};
use regex::Regex;
use thiserror::Error;

const BEGIN_TAG_HEADER: &str = "BEGIN TAG HEADER";
const END_TAG_HEADER: &str = "END TAG HEADER";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed tag header: {reason}")]
    MalformedHeader { reason: String },

    #[error("{line}: malformed expectation: {reason}")]
    MalformedExpectation { line: usize, reason: String },

    #[error("{line}: unknown status {token:?}")]
    UnknownStatus { line: usize, token: String },

    #[error("{line}: {source}")]
    MalformedQuery {
        line: usize,
        source: MalformedQuery,
    },

    #[error(transparent)]
    DuplicateTag(#[from] DuplicateTag),
}

pub fn parse(text: &str) -> Result<Content, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let (header, body_start) = split_header(&lines)?;
    let tag_sets = parse_tag_sets(&header)?;

    fn flush(current: &mut Chunk, chunks: &mut Vec<Chunk>) {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
    }

    let mut chunks = Vec::new();
    let mut current = Chunk::default();

    for (idx, raw) in lines.iter().enumerate().skip(body_start) {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            flush(&mut current, &mut chunks);
        } else if trimmed.starts_with('#') {
            // A comment below an expectation introduces the next chunk's
            // leading block, as if a blank line preceded it.
            if !current.expectations.is_empty() {
                flush(&mut current, &mut chunks);
            }
            current.comments.push(trimmed.to_string());
        } else {
            current
                .expectations
                .push(parse_expectation(trimmed, line_no)?);
        }
    }
    flush(&mut current, &mut chunks);

    Ok(Content {
        header,
        tag_sets,
        chunks,
    })
}

// The header is the first contiguous comment block. When BEGIN/END TAG
// HEADER markers are present the block must close with the END marker,
// and anything after it belongs to the first chunk.
fn split_header(lines: &[&str]) -> Result<(Vec<String>, usize), ParseError> {
    let malformed = |reason: &str| ParseError::MalformedHeader {
        reason: reason.to_string(),
    };

    let first = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or_else(|| malformed("document is empty"))?;
    if !lines[first].trim().starts_with('#') {
        return Err(malformed(
            "document must begin with a tag header comment block",
        ));
    }

    let mut end = first;
    while end < lines.len() && lines[end].trim().starts_with('#') {
        end += 1;
    }
    let block: Vec<String> = lines[first..end]
        .iter()
        .map(|l| l.trim().to_string())
        .collect();

    if block.iter().any(|l| l.contains(BEGIN_TAG_HEADER)) {
        let close = block
            .iter()
            .position(|l| l.contains(END_TAG_HEADER))
            .ok_or_else(|| malformed("missing END TAG HEADER marker"))?;
        return Ok((block[..=close].to_vec(), first + close + 1));
    }
    Ok((block, end))
}

fn parse_tag_sets(header: &[String]) -> Result<TagSetList, ParseError> {
    let malformed = |reason: String| ParseError::MalformedHeader { reason };

    let mut groups = Vec::new();
    for line in header {
        let body = line.trim_start_matches('#').trim();
        let Some(decl) = body.strip_prefix("tags:") else {
            continue;
        };
        let decl = decl.trim();
        let inner = decl
            .strip_prefix('[')
            .and_then(|d| d.strip_suffix(']'))
            .ok_or_else(|| malformed(format!("tag declaration {decl:?} is not bracketed")))?;
        let tags: Vec<String> = inner.split_whitespace().map(str::to_string).collect();
        if tags.is_empty() {
            return Err(malformed("empty tag group".to_string()));
        }
        groups.push(tags);
    }
    Ok(TagSetList::new(groups)?)
}

fn parse_expectation(line: &str, line_no: usize) -> Result<Expectation, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedExpectation {
        line: line_no,
        reason: reason.to_string(),
    };

    let (code, comment) = match line.find('#') {
        Some(pos) => (
            line[..pos].trim_end(),
            Some(line[pos..].trim_end().to_string()),
        ),
        None => (line, None),
    };
    let mut rest = code.trim_start();

    let bug_re = Regex::new(r"^(?:https?://\S+|[\w.-]+\.[a-z]{2,}/\S+|b/\d+)$")
        .expect("regex for bug tokens");
    let mut bug = None;
    if let Some(token) = rest.split_whitespace().next() {
        if bug_re.is_match(token) {
            bug = Some(token.to_string());
            rest = rest[token.len()..].trim_start();
        }
    }

    let mut tags = crate::tags::TagSet::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after
            .find(']')
            .ok_or_else(|| malformed("unterminated tag list"))?;
        tags = after[..close].split_whitespace().collect();
        rest = after[close + 1..].trim_start();
    }

    let query_token = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| malformed("expected a query"))?;
    if query_token.starts_with('[') {
        return Err(malformed("expected a query before the status list"));
    }
    let query = Query::parse(query_token).map_err(|source| ParseError::MalformedQuery {
        line: line_no,
        source,
    })?;
    rest = rest[query_token.len()..].trim_start();

    let after = rest
        .strip_prefix('[')
        .ok_or_else(|| malformed("expected a status list"))?;
    let close = after
        .find(']')
        .ok_or_else(|| malformed("unterminated status list"))?;
    let mut statuses = Vec::new();
    for token in after[..close].split_whitespace() {
        let status = Status::from_name(token).ok_or_else(|| ParseError::UnknownStatus {
            line: line_no,
            token: token.to_string(),
        })?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    if statuses.is_empty() {
        return Err(malformed("expected at least one status"));
    }
    rest = after[close + 1..].trim();
    if !rest.is_empty() {
        return Err(malformed("unexpected trailing text after status list"));
    }

    Ok(Expectation {
        line: line_no,
        bug,
        tags,
        query,
        statuses,
        comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagSet;

    const DOC: &str = "\
# BEGIN TAG HEADER
# OS
# tags: [ os-a os-b os-c ]
# GPU
# tags: [ gpu-a gpu-b ]
# END TAG HEADER

# Hand-maintained suppressions.
crbug.com/a/123 [ os-a ] a:b,c:* [ Failure ]  # top-level
a:b,c:d:e [ Slow Skip ]

# Keep tidy. ##ROLLER_MUTABLE##
crbug.com/a/124 [ gpu-b os-c ] a:x:* [ RetryOnFailure ]
";

    #[test]
    fn parses_header_groups_in_declaration_order() {
        let content = parse(DOC).unwrap();
        assert_eq!(content.tag_sets.group_count(), 2);
        assert_eq!(content.tag_sets.position("os-c"), Some((0, 2)));
        assert_eq!(content.tag_sets.position("gpu-a"), Some((1, 0)));
        assert_eq!(content.header.len(), 6);
        assert!(content.header[5].contains("END TAG HEADER"));
    }

    #[test]
    fn parses_chunks_and_expectations() {
        let content = parse(DOC).unwrap();
        assert_eq!(content.chunks.len(), 2);

        let first = &content.chunks[0];
        assert_eq!(first.comments, ["# Hand-maintained suppressions."]);
        assert_eq!(first.expectations.len(), 2);

        let e = &first.expectations[0];
        assert_eq!(e.line, 9);
        assert_eq!(e.bug.as_deref(), Some("crbug.com/a/123"));
        assert_eq!(e.tags, ["os-a"].into_iter().collect::<TagSet>());
        assert_eq!(e.query.to_string(), "a:b,c:*");
        assert_eq!(e.statuses, vec![Status::Failure]);
        assert_eq!(e.comment.as_deref(), Some("# top-level"));

        let bare = &first.expectations[1];
        assert_eq!(bare.bug, None);
        assert!(bare.tags.is_empty());
        assert_eq!(bare.statuses, vec![Status::Slow, Status::Skip]);
    }

    #[test]
    fn detects_mutability_sentinel() {
        let content = parse(DOC).unwrap();
        assert_eq!(
            content.chunks[1].mutability(),
            super::super::Mutability::Mutable
        );
    }

    #[test]
    fn header_without_markers_is_first_comment_block() {
        let content = parse("# tags: [ os-a ]\n\na:b: [ Failure ]\n").unwrap();
        assert_eq!(content.header, ["# tags: [ os-a ]"]);
        assert_eq!(content.chunks.len(), 1);
    }

    #[test]
    fn comment_after_expectation_starts_a_new_chunk() {
        let content = parse(
            "# tags: [ os-a ]\n\na:b: [ Failure ]\n# next section\na:c: [ Failure ]\n",
        )
        .unwrap();
        assert_eq!(content.chunks.len(), 2);
        assert_eq!(content.chunks[1].comments, ["# next section"]);
    }

    #[test]
    fn rejects_missing_header() {
        let err = parse("a:b: [ Failure ]\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { .. }));
    }

    #[test]
    fn rejects_unterminated_tag_declaration() {
        let err = parse("# tags: [ os-a\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { .. }));
    }

    #[test]
    fn rejects_missing_end_marker() {
        let err = parse("# BEGIN TAG HEADER\n# tags: [ os-a ]\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader { .. }));
    }

    #[test]
    fn rejects_duplicate_tag_across_groups() {
        let err = parse("# tags: [ os-a ]\n# tags: [ os-a ]\n").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateTag(_)));
    }

    #[test]
    fn rejects_unknown_status() {
        let err = parse("# tags: [ os-a ]\n\na:b: [ Flaky ]\n").unwrap_err();
        match err {
            ParseError::UnknownStatus { line, token } => {
                assert_eq!(line, 3);
                assert_eq!(token, "Flaky");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_expectation_line() {
        let err = parse("# tags: [ os-a ]\n\n[ os-a ] [ Failure ]\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedExpectation { .. }));
    }

    #[test]
    fn rejects_malformed_query() {
        let err = parse("# tags: [ os-a ]\n\na:*:b [ Failure ]\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedQuery { .. }));
    }

    #[test]
    fn rejects_trailing_text() {
        let err = parse("# tags: [ os-a ]\n\na:b: [ Failure ] junk\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedExpectation { .. }));
    }
}
