// SPDX-License-Identifier: MIT OR Apache-2.0

//! Depth-bounded, breadth-first exploration of the block graph.
//!
//! Starting at a root the graph is expanded one level at a time. Every distinct path from the
//! root to a block is explored separately, as the access of `inherited` blocks depends on the
//! path they are reached through. A block never appears twice on the same path, but can appear
//! on many different paths.
//!
//! All blocks on one level share a single store call to fetch their children.
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::time::Duration;

use canvas_core::{AccessType, Block, BlockId, UserId};
use canvas_store::BlockStore;
use tracing::{debug, trace, warn};

use crate::access::resolve;
use crate::config::ViewConfig;
use crate::error::CanvasError;

/// One block reached along one specific path from the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalRecord {
    pub id: BlockId,

    /// Ids from the root down to and including this block.
    pub path: Vec<BlockId>,

    /// Number of edges between the root and this block on this path.
    pub depth: usize,

    /// Access setting stored on the block itself.
    pub direct_access: AccessType,

    /// Access resolved for this path.
    pub effective_access: AccessType,

    /// Own color of the block or the nearest ancestor color on this path.
    pub color: String,

    /// `false` if this block sits on the deepest level and was not expanded.
    pub is_complete: bool,

    /// `true` if access along this path could not be proven.
    pub is_ambiguous: bool,

    /// `true` if expansion stopped at this block due to the depth limit while it has children.
    pub has_deeper_children: bool,
}

/// Result of a traversal: all records in breadth-first order and the blocks they refer to.
#[derive(Clone, Debug, Default)]
pub struct Traversal {
    pub records: Vec<TraversalRecord>,

    /// First state seen of every reached block.
    pub blocks: HashMap<BlockId, Block>,
}

impl Traversal {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A path waiting to be reported and expanded.
struct Step {
    id: BlockId,
    path: Vec<BlockId>,
    effective: AccessType,
    ambiguous: bool,
    color: String,
}

impl Step {
    fn record(&self, block: &Block, depth: usize, max_depth: usize) -> TraversalRecord {
        let at_ceiling = depth >= max_depth;
        TraversalRecord {
            id: self.id,
            path: self.path.clone(),
            depth,
            direct_access: block.access_type,
            effective_access: self.effective,
            color: self.color.clone(),
            is_complete: !at_ceiling,
            is_ambiguous: self.ambiguous,
            has_deeper_children: at_ceiling && !block.children.is_empty(),
        }
    }
}

/// Explore the graph below `root` as seen by `user`.
///
/// A root which does not exist or is not visible to the user results in an empty traversal. Below
/// the root every reached block is included, whatever its access. It is up to the consumer to
/// decide what to show based on the resolved access and ambiguity of each record.
///
/// Blocks disappearing while the traversal is running are not expanded any further.
pub async fn traverse<S>(
    store: &S,
    root: &BlockId,
    user: &UserId,
    config: &ViewConfig,
) -> Result<Traversal, CanvasError<S::Error>>
where
    S: BlockStore,
{
    let mut traversal = Traversal::default();

    let Some(root_block) = with_timeout(config.store_timeout, store.fetch_root(root, user)).await?
    else {
        debug!(%root, %user, "root not found or not visible");
        return Ok(traversal);
    };

    let resolution = resolve(&root_block, AccessType::Inherited, user);
    let mut frontier = vec![Step {
        id: root_block.id,
        path: vec![root_block.id],
        effective: resolution.effective,
        ambiguous: resolution.ambiguous,
        color: root_block
            .color
            .clone()
            .unwrap_or_else(|| config.default_color.clone()),
    }];
    traversal.blocks.insert(root_block.id, root_block);

    let mut depth = 0;

    loop {
        for step in &frontier {
            if let Some(block) = traversal.blocks.get(&step.id) {
                traversal
                    .records
                    .push(step.record(block, depth, config.max_depth));
            }
        }

        if depth >= config.max_depth {
            break;
        }

        let requested: BTreeSet<BlockId> = frontier
            .iter()
            .map(|step| step.id)
            .filter(|id| {
                traversal
                    .blocks
                    .get(id)
                    .is_some_and(|block| !block.children.is_empty())
            })
            .collect();

        if requested.is_empty() {
            break;
        }

        let parents: Vec<BlockId> = requested.iter().copied().collect();

        debug!(depth, parents = parents.len(), "expand level");
        let batch = with_timeout(config.store_timeout, store.fetch_children_batch(&parents)).await?;

        let mut next = Vec::new();
        for step in frontier {
            // Leaves were not requested.
            if !requested.contains(&step.id) {
                continue;
            }

            let Some(children) = batch.get(&step.id) else {
                trace!(id = %step.id, "block vanished during traversal");
                continue;
            };

            for child in children {
                if step.path.contains(&child.id) {
                    trace!(id = %child.id, path = ?step.path, "cycle suppressed");
                    continue;
                }

                let resolution = resolve(child, step.effective, user);
                let mut path = step.path.clone();
                path.push(child.id);

                next.push(Step {
                    id: child.id,
                    path,
                    effective: resolution.effective,
                    ambiguous: step.ambiguous || resolution.ambiguous,
                    color: child.color.clone().unwrap_or_else(|| step.color.clone()),
                });

                traversal
                    .blocks
                    .entry(child.id)
                    .or_insert_with(|| child.clone());
            }
        }

        if next.is_empty() {
            break;
        }

        frontier = next;
        depth += 1;
    }

    Ok(traversal)
}

/// Run a store call, optionally bounded in time.
pub(crate) async fn with_timeout<T, E>(
    timeout: Option<Duration>,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, CanvasError<E>>
where
    E: Error + 'static,
{
    let result = match timeout {
        Some(duration) => tokio::time::timeout(duration, call).await.map_err(|_| {
            warn!(?duration, "block store call timed out");
            CanvasError::StoreTimeout(duration)
        })?,
        None => call.await,
    };

    result.map_err(CanvasError::StoreUnavailable)
}
