// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::convert::Infallible;

use canvas_core::{Block, BlockId, BlockPatch, NewBlock, UserId, timestamp};
use tracing::trace;

use crate::blocks::{BlockStore, WritableBlockStore};
use crate::memory::MemoryStore;

impl BlockStore for MemoryStore {
    type Error = Infallible;

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>, Infallible> {
        Ok(self.read_store().blocks.get(id).cloned())
    }

    async fn fetch_children_batch(
        &self,
        ids: &[BlockId],
    ) -> Result<HashMap<BlockId, Vec<Block>>, Infallible> {
        let store = self.read_store();
        let mut result = HashMap::with_capacity(ids.len());

        for id in ids {
            let Some(parent) = store.blocks.get(id) else {
                continue;
            };

            let children = parent
                .children
                .iter()
                .filter_map(|child_id| {
                    let child = store.blocks.get(child_id).cloned();
                    if child.is_none() {
                        trace!(parent = %id, child = %child_id, "skip edge to missing block");
                    }
                    child
                })
                .collect();

            result.insert(*id, children);
        }

        Ok(result)
    }

    async fn root_block_of(&self, user: &UserId) -> Result<Option<BlockId>, Infallible> {
        // Blocks are ordered by id, the first match is the oldest one.
        Ok(self
            .read_store()
            .blocks
            .values()
            .find(|block| &block.creator_id == user)
            .map(|block| block.id))
    }

    async fn parent_count(&self, id: &BlockId) -> Result<usize, Infallible> {
        Ok(self
            .read_store()
            .blocks
            .values()
            .filter(|block| block.children.contains(id))
            .count())
    }
}

impl WritableBlockStore for MemoryStore {
    async fn insert_block(&self, creator: &UserId, new: NewBlock) -> Result<Block, Infallible> {
        let mut store = self.write_store();
        let id = store.next_id();
        let block = Block::from_new(id, *creator, new, timestamp::now());
        store.blocks.insert(id, block.clone());
        Ok(block)
    }

    async fn update_block(
        &self,
        id: &BlockId,
        patch: BlockPatch,
    ) -> Result<Option<Block>, Infallible> {
        let mut store = self.write_store();

        // Edges to blocks which don't exist are dropped.
        let children = patch.children.map(|children| {
            children
                .into_iter()
                .filter(|child| store.blocks.contains_key(child))
                .collect()
        });
        let patch = BlockPatch { children, ..patch };

        let Some(block) = store.blocks.get_mut(id) else {
            return Ok(None);
        };
        block.apply(patch, timestamp::now());
        Ok(Some(block.clone()))
    }

    async fn add_child(&self, parent: &BlockId, child: &BlockId) -> Result<bool, Infallible> {
        let mut store = self.write_store();
        if !store.blocks.contains_key(child) {
            return Ok(false);
        }
        let Some(parent) = store.blocks.get_mut(parent) else {
            return Ok(false);
        };
        if parent.children.contains(child) {
            return Ok(false);
        }
        parent.children.push(*child);
        Ok(true)
    }

    async fn remove_child(&self, parent: &BlockId, child: &BlockId) -> Result<bool, Infallible> {
        let mut store = self.write_store();
        let Some(parent) = store.blocks.get_mut(parent) else {
            return Ok(false);
        };
        let len = parent.children.len();
        parent.children.retain(|id| id != child);
        Ok(parent.children.len() < len)
    }

    async fn grant_visible(&self, id: &BlockId, user: &UserId) -> Result<bool, Infallible> {
        Ok(self
            .write_store()
            .blocks
            .get_mut(id)
            .is_some_and(|block| block.visible_user_ids.insert(*user)))
    }

    async fn grant_editable(&self, id: &BlockId, user: &UserId) -> Result<bool, Infallible> {
        Ok(self
            .write_store()
            .blocks
            .get_mut(id)
            .is_some_and(|block| block.editable_user_ids.insert(*user)))
    }

    async fn delete_block(&self, id: &BlockId) -> Result<bool, Infallible> {
        let mut store = self.write_store();
        if store.blocks.remove(id).is_none() {
            return Ok(false);
        }
        for block in store.blocks.values_mut() {
            block.children.retain(|child| child != id);
        }
        Ok(true)
    }
}
