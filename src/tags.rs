//! Environment tags and the header-declared tag grouping.
//!
//! Tags are opaque tokens scoping an expectation to an environment. The
//! file header partitions them into ordered groups (OS, GPU, driver, ...);
//! group order and in-group declaration order drive priority reduction
//! and the canonical formatting order.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// One tag is declared in more than one header group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tag {tag:?} is declared in more than one tag group")]
pub struct DuplicateTag {
    pub tag: String,
}

/// An unordered set of tags. Equality is set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> TagSet {
        TagSet::default()
    }

    pub fn add(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    pub fn remove_all(&mut self, other: &TagSet) {
        for tag in &other.0 {
            self.0.remove(tag);
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn intersect(&self, other: &TagSet) -> TagSet {
        TagSet(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn is_subset(&self, other: &TagSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> TagSet {
        TagSet(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(tag)?;
            first = false;
        }
        Ok(())
    }
}

/// The ordered sequence of tag groups declared by the file header. Group
/// index is the group's priority (lower index wins between groups);
/// within a group, the later a tag is declared the higher its priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSetList {
    groups: Vec<Vec<String>>,
}

impl TagSetList {
    pub fn new(groups: Vec<Vec<String>>) -> Result<TagSetList, DuplicateTag> {
        let mut seen = BTreeSet::new();
        for group in &groups {
            for tag in group {
                if !seen.insert(tag.clone()) {
                    return Err(DuplicateTag { tag: tag.clone() });
                }
            }
        }
        Ok(TagSetList { groups })
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The `(group index, in-group index)` of a declared tag.
    pub fn position(&self, tag: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, group)| {
            group
                .iter()
                .position(|t| t == tag)
                .map(|ti| (gi, ti))
        })
    }

    pub fn is_known(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Drop tags that no declared group contains.
    pub fn retain_known(&self, tags: &TagSet) -> TagSet {
        tags.iter().filter(|t| self.is_known(t)).collect()
    }

    /// Keep at most one tag per group: when several of `tags` share a
    /// group, the highest-priority one (last declared) survives. Unknown
    /// tags are dropped. Idempotent.
    pub fn reduce(&self, tags: &TagSet) -> TagSet {
        let mut winners: Vec<Option<usize>> = vec![None; self.groups.len()];
        for tag in tags.iter() {
            if let Some((gi, ti)) = self.position(tag) {
                let slot = &mut winners[gi];
                if slot.map(|best| ti > best).unwrap_or(true) {
                    *slot = Some(ti);
                }
            }
        }
        winners
            .iter()
            .enumerate()
            .filter_map(|(gi, ti)| ti.map(|ti| self.groups[gi][ti].clone()))
            .collect()
    }
}
