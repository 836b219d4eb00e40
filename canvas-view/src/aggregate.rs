// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding of per-path traversal records into one record per block.
//!
//! A block reached along several paths is reported once. Its paths are collected, completeness is
//! combined over all of them and it is ambiguous if any path is ambiguous. Effective access and
//! color are taken from the representative path: the shortest one, with ties broken by comparing
//! the ids along the path.
//!
//! The fold is commutative and associative, the order records arrive in does not change the
//! outcome.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use canvas_core::{AccessType, Block, BlockId};

use crate::traversal::{Traversal, TraversalRecord};

/// Separates block ids within one path in its textual form.
const ID_SEPARATOR: &str = ",";

/// Separates paths from each other in their textual form.
const PATH_SEPARATOR: &str = ";";

/// Order of paths: shorter first, then by comparing ids.
fn path_order(a: &[BlockId], b: &[BlockId]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Combined state of all paths leading to one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSummary {
    /// Distinct paths in path order, never empty.
    paths: Vec<Vec<BlockId>>,
    effective_access: AccessType,
    color: String,
    is_complete: bool,
    has_deeper_children: bool,
    is_ambiguous: bool,
}

impl PathSummary {
    pub fn from_record(record: TraversalRecord) -> Self {
        Self {
            paths: vec![record.path],
            effective_access: record.effective_access,
            color: record.color,
            is_complete: record.is_complete,
            has_deeper_children: record.has_deeper_children,
            is_ambiguous: record.is_ambiguous,
        }
    }

    /// Combine two summaries of the same block.
    pub fn merge(self, other: Self) -> Self {
        let order = path_order(self.representative_path(), other.representative_path());
        let (first, second) = match order {
            Ordering::Greater => (other, self),
            _ => (self, other),
        };

        let mut paths = first.paths;
        paths.extend(second.paths);
        paths.sort_by(|a, b| path_order(a, b));
        paths.dedup();

        Self {
            paths,
            effective_access: first.effective_access,
            color: first.color,
            is_complete: first.is_complete && second.is_complete,
            has_deeper_children: first.has_deeper_children || second.has_deeper_children,
            is_ambiguous: first.is_ambiguous || second.is_ambiguous,
        }
    }

    pub fn paths(&self) -> &[Vec<BlockId>] {
        &self.paths
    }

    /// Path which decides about effective access and color.
    pub fn representative_path(&self) -> &[BlockId] {
        &self.paths[0]
    }

    pub fn effective_access(&self) -> AccessType {
        self.effective_access
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn is_ambiguous(&self) -> bool {
        self.is_ambiguous
    }

    /// `true` if every path was expanded and none of them was cut off by the depth limit.
    pub fn is_fully_loaded(&self) -> bool {
        self.is_complete && !self.has_deeper_children
    }

    /// Every path as a comma-separated list of ids, for example `"1,4,9"`.
    pub fn path_strings(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|path| {
                path.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(ID_SEPARATOR)
            })
            .collect()
    }

    /// All paths in one string, separated by semicolons, for example `"1,4;1,2,4"`.
    pub fn joined_paths(&self) -> String {
        self.path_strings().join(PATH_SEPARATOR)
    }
}

/// Fold records into one summary per block.
pub fn reduce(
    records: impl IntoIterator<Item = TraversalRecord>,
) -> BTreeMap<BlockId, PathSummary> {
    let mut summaries: BTreeMap<BlockId, PathSummary> = BTreeMap::new();
    for record in records {
        let id = record.id;
        let summary = PathSummary::from_record(record);
        let summary = match summaries.remove(&id) {
            Some(existing) => existing.merge(summary),
            None => summary,
        };
        summaries.insert(id, summary);
    }
    summaries
}

/// A block together with the combined state of all paths leading to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedRecord {
    pub block: Block,
    pub summary: PathSummary,
}

impl AggregatedRecord {
    pub fn id(&self) -> BlockId {
        self.block.id
    }

    /// Ids of the direct children as stored, whether or not they were reached.
    pub fn first_level_children(&self) -> &[BlockId] {
        &self.block.children
    }
}

/// One record per reached block, ordered by block id.
pub fn aggregate(traversal: Traversal) -> BTreeMap<BlockId, AggregatedRecord> {
    let Traversal { records, mut blocks } = traversal;

    reduce(records)
        .into_iter()
        .filter_map(|(id, summary)| {
            let block = blocks.remove(&id)?;
            Some((id, AggregatedRecord { block, summary }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use canvas_core::{AccessType, BlockId};

    use crate::traversal::TraversalRecord;

    use super::{PathSummary, reduce};

    fn record(path: &[i64], effective_access: AccessType, color: &str) -> TraversalRecord {
        let path: Vec<BlockId> = path.iter().copied().map(BlockId::new).collect();
        TraversalRecord {
            id: *path.last().unwrap(),
            depth: path.len() - 1,
            path,
            direct_access: AccessType::Inherited,
            effective_access,
            color: color.to_string(),
            is_complete: true,
            is_ambiguous: false,
            has_deeper_children: false,
        }
    }

    #[test]
    fn shortest_path_decides() {
        let records = vec![
            record(&[1, 3, 5, 9], AccessType::Public, "red"),
            record(&[1, 4, 9], AccessType::Private, "blue"),
            record(&[1, 2, 9], AccessType::Public, "green"),
        ];

        let summaries = reduce(records);
        let summary = &summaries[&BlockId::new(9)];

        assert_eq!(summary.representative_path(), &[1, 2, 9].map(BlockId::new));
        assert_eq!(summary.effective_access(), AccessType::Public);
        assert_eq!(summary.color(), "green");
        assert_eq!(summary.path_strings(), vec!["1,2,9", "1,4,9", "1,3,5,9"]);
        assert_eq!(summary.joined_paths(), "1,2,9;1,4,9;1,3,5,9");
    }

    #[test]
    fn order_does_not_matter() {
        let mut deep = record(&[1, 2, 3, 4], AccessType::Private, "red");
        deep.is_complete = false;
        deep.has_deeper_children = true;
        let mut ambiguous = record(&[1, 5, 4], AccessType::Inherited, "blue");
        ambiguous.is_ambiguous = true;

        let records = vec![
            record(&[1], AccessType::Public, "red"),
            deep,
            ambiguous,
            record(&[1, 6, 4], AccessType::Public, "green"),
            record(&[1, 5, 4], AccessType::Inherited, "blue"),
        ];

        let forward = reduce(records.clone());
        let backward = reduce(records.into_iter().rev());
        assert_eq!(forward, backward);

        let summary = &forward[&BlockId::new(4)];
        assert!(summary.is_ambiguous());
        assert!(!summary.is_fully_loaded());

        // Duplicated paths are only kept once.
        assert_eq!(summary.paths().len(), 3);
        assert_eq!(summary.color(), "blue");
    }

    #[test]
    fn merge_is_associative() {
        let a = PathSummary::from_record(record(&[1, 7], AccessType::Public, "red"));
        let b = PathSummary::from_record(record(&[1, 2, 7], AccessType::Private, "blue"));
        let mut c = PathSummary::from_record(record(&[1, 3, 7], AccessType::Public, "green"));
        c.is_complete = false;

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
        assert!(!left.is_fully_loaded());
        assert_eq!(left.color(), "red");
    }
}
