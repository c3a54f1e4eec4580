//! Expectation update engine for a WebGPU conformance test suite.
//!
//! The engine consumes an expectations document, a capture of fresh CI
//! results, and the listing of known tests, then rewrites the chunks the
//! document allows it to touch: stale lines are dropped, newly failing
//! or flaking tests are collapsed into minimal wildcard expectations in
//! the reserved chunks, and the whole document is re-emitted in a
//! canonical order so rolls review as small diffs. All engine APIs work
//! on in-memory values; file and process I/O belongs to the caller.

pub mod cli;
pub mod diagnostics;
pub mod expectations;
pub mod query;
pub mod query_tree;
pub mod result;
pub mod tags;
pub mod test_list;
pub mod workflow;
