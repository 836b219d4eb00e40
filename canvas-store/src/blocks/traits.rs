// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::error::Error;

use canvas_core::{Block, BlockId, BlockPatch, NewBlock, UserId};

/// Read-only interface to the block graph.
///
/// Implementations are expected to serve concurrent readers. Results of different calls are not
/// required to come from the same snapshot: a block returned by one call might already be gone in
/// the next one.
pub trait BlockStore {
    type Error: Error + 'static;

    /// Get a single block by its id.
    fn get_block(&self, id: &BlockId) -> impl Future<Output = Result<Option<Block>, Self::Error>>;

    /// Get the block which serves as the root of a view for the given user.
    ///
    /// Returns `None` both when the block does not exist and when the user is not allowed to see
    /// it as a root, callers can't tell these cases apart.
    fn fetch_root(
        &self,
        id: &BlockId,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Block>, Self::Error>> {
        async move {
            let block = self.get_block(id).await?;
            Ok(block.filter(|block| block.is_root_visible_to(user)))
        }
    }

    /// Get the children of all given blocks in one go.
    ///
    /// Every requested block which still exists is present in the returned map, holding its
    /// children in edge order (possibly none). Requested blocks which do not exist are missing
    /// from the map. Edges pointing at blocks which do not exist are skipped.
    fn fetch_children_batch(
        &self,
        ids: &[BlockId],
    ) -> impl Future<Output = Result<HashMap<BlockId, Vec<Block>>, Self::Error>>;

    /// Get the home block of a user, that is the first block they've created.
    fn root_block_of(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<BlockId>, Self::Error>>;

    /// Number of blocks pointing at this block.
    fn parent_count(&self, id: &BlockId) -> impl Future<Output = Result<usize, Self::Error>>;
}

/// Interface to mutate the block graph.
pub trait WritableBlockStore: BlockStore {
    /// Persist a new block created by the given user.
    ///
    /// The store assigns id and timestamps and grants the creator visibility and edit rights.
    fn insert_block(
        &self,
        creator: &UserId,
        block: NewBlock,
    ) -> impl Future<Output = Result<Block, Self::Error>>;

    /// Apply a partial update to a block. Returns `None` if the block does not exist.
    fn update_block(
        &self,
        id: &BlockId,
        patch: BlockPatch,
    ) -> impl Future<Output = Result<Option<Block>, Self::Error>>;

    /// Append an edge from parent to child.
    ///
    /// Returns `false` if the edge already existed or one of both blocks does not exist.
    fn add_child(
        &self,
        parent: &BlockId,
        child: &BlockId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Remove the edge from parent to child. Returns `false` if there was no such edge.
    fn remove_child(
        &self,
        parent: &BlockId,
        child: &BlockId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Directly share a block with a user.
    fn grant_visible(
        &self,
        id: &BlockId,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Grant a user edit rights on a block.
    fn grant_editable(
        &self,
        id: &BlockId,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Remove a block together with its grants and every edge from or to it.
    fn delete_block(&self, id: &BlockId) -> impl Future<Output = Result<bool, Self::Error>>;
}
