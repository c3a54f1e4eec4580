use crate::cli::{CheckArgs, FmtArgs, RollArgs};
use crate::diagnostics;
use crate::expectations::Content;
use crate::result::{self, ResultRecord};
use crate::tags::TagSet;
use crate::test_list::TestList;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

pub fn run_roll(args: RollArgs) -> Result<()> {
    let text = read(&args.expectations)?;
    let mut content = Content::parse(&text)
        .with_context(|| format!("parse {}", args.expectations.display()))?;

    let records: Vec<ResultRecord> = serde_json::from_str(&read(&args.results)?)
        .with_context(|| format!("parse {}", args.results.display()))?;
    let remove: TagSet = args.remove_tag.iter().map(String::as_str).collect();
    let results = result::load_results(records, &content.tag_sets, &remove)
        .with_context(|| format!("load results from {}", args.results.display()))?;

    let test_list = TestList::parse(&read(&args.test_list)?)
        .with_context(|| format!("parse {}", args.test_list.display()))?;

    if args.verbose {
        eprintln!(
            "loaded {} results against {} known tests",
            results.len(),
            test_list.len()
        );
        if let Some(slowest) = results.iter().max_by_key(|r| r.duration_ms) {
            eprintln!(
                "slowest result: {} ({}ms)",
                slowest.query, slowest.duration_ms
            );
        }
    }

    let diags = crate::expectations::update(&mut content, &results, &test_list, args.verbose);
    for diag in &diags {
        eprintln!("{diag}");
    }
    if diagnostics::has_errors(&diags) {
        bail!("update produced error diagnostics; expectations left untouched");
    }

    let out = args.out.as_deref().unwrap_or(&args.expectations);
    fs::write(out, content.format()).with_context(|| format!("write {}", out.display()))?;
    if args.verbose {
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

pub fn run_fmt(args: FmtArgs) -> Result<()> {
    let text = read(&args.expectations)?;
    let content = Content::parse(&text)
        .with_context(|| format!("parse {}", args.expectations.display()))?;
    let out = args.out.as_deref().unwrap_or(&args.expectations);
    fs::write(out, content.format()).with_context(|| format!("write {}", out.display()))?;
    Ok(())
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let text = read(&args.expectations)?;
    let content = Content::parse(&text)
        .with_context(|| format!("parse {}", args.expectations.display()))?;
    println!(
        "{}: {} tag groups, {} chunks",
        args.expectations.display(),
        content.tag_sets.group_count(),
        content.chunks.len()
    );
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
