// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point to resolve views and change blocks on behalf of a user.
use std::collections::BTreeMap;

use canvas_core::{AccessType, Block, BlockId, BlockPatch, NewBlock, UserId};
use canvas_store::{BlockStore, WritableBlockStore};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{AggregatedRecord, aggregate};
use crate::config::ViewConfig;
use crate::error::CanvasError;
use crate::traversal::{traverse, with_timeout};
use crate::view::{BlockView, assemble};

/// How a view came about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// Resolved for the requesting user from the requested root.
    Authoritative,

    /// The root does not exist or the user may not see it. The view is empty.
    NotVisible,

    /// No user was given, the view shows the configured public root instead.
    AnonymousFallback,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewResponse {
    pub status: ViewStatus,
    pub blocks: BTreeMap<BlockId, BlockView>,
}

impl ViewResponse {
    fn not_visible() -> Self {
        Self {
            status: ViewStatus::NotVisible,
            blocks: BTreeMap::new(),
        }
    }

    /// `true` if this is not the view the caller asked for.
    pub fn is_degraded(&self) -> bool {
        self.status != ViewStatus::Authoritative
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Outcome of detaching a child from its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detached {
    /// The edge was removed, the child is still referenced by other parents.
    Removed,

    /// The edge was the last one pointing at the child, which was deleted with it.
    Deleted,
}

/// Resolves views over a block store and applies changes to it, enforcing access rules.
#[derive(Clone, Debug)]
pub struct Canvas<S> {
    store: S,
    config: ViewConfig,
}

impl<S> Canvas<S> {
    pub fn new(store: S) -> Self {
        Self::from_config(store, ViewConfig::default())
    }

    pub fn from_config(store: S, config: ViewConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }
}

impl<S> Canvas<S>
where
    S: BlockStore,
{
    async fn call<T>(
        &self,
        future: impl Future<Output = Result<T, S::Error>>,
    ) -> Result<T, CanvasError<S::Error>> {
        with_timeout(self.config.store_timeout, future).await
    }

    /// Traverse from `root` and fold the result into one record per reached block.
    pub async fn resolve_records(
        &self,
        user: &UserId,
        root: &BlockId,
    ) -> Result<BTreeMap<BlockId, AggregatedRecord>, CanvasError<S::Error>> {
        let traversal = traverse(&self.store, root, user, &self.config).await?;
        Ok(aggregate(traversal))
    }

    /// Resolve the view of `user` starting at `root`.
    ///
    /// Missing roots and roots the user may not see both result in an empty view with status
    /// [`ViewStatus::NotVisible`].
    pub async fn resolve_view(
        &self,
        user: &UserId,
        root: &BlockId,
    ) -> Result<ViewResponse, CanvasError<S::Error>> {
        let records = self.resolve_records(user, root).await?;
        if records.is_empty() {
            return Ok(ViewResponse::not_visible());
        }

        debug!(%user, %root, blocks = records.len(), "resolved view");
        Ok(ViewResponse {
            status: ViewStatus::Authoritative,
            blocks: assemble(&records),
        })
    }

    /// Resolve the view of a user starting at their home block.
    ///
    /// Without a user the configured fallback root is shown, viewed with the identity of its
    /// owner.
    pub async fn resolve_home_view(
        &self,
        user: Option<&UserId>,
    ) -> Result<ViewResponse, CanvasError<S::Error>> {
        let Some(user) = user else {
            let fallback = self.config.fallback_root;
            debug!(root = %fallback.block_id, "anonymous visitor, show fallback root");
            let mut response = self
                .resolve_view(&fallback.user_id, &fallback.block_id)
                .await?;
            response.status = ViewStatus::AnonymousFallback;
            return Ok(response);
        };

        let Some(home) = self.call(self.store.root_block_of(user)).await? else {
            debug!(%user, "user has no home block");
            return Ok(ViewResponse::not_visible());
        };

        self.resolve_view(user, &home).await
    }

    async fn existing(&self, id: &BlockId) -> Result<Block, CanvasError<S::Error>> {
        self.call(self.store.get_block(id))
            .await?
            .ok_or(CanvasError::BlockNotFound(*id))
    }
}

impl<S> Canvas<S>
where
    S: WritableBlockStore,
{
    /// Create the home block of a new user, titled with their name.
    ///
    /// As it is the first block the user creates it becomes their home block.
    pub async fn register_user(
        &self,
        user: &UserId,
        username: &str,
    ) -> Result<Block, CanvasError<S::Error>> {
        let block = self
            .call(self.store.insert_block(
                user,
                NewBlock::new()
                    .text(username)
                    .access_type(AccessType::Private),
            ))
            .await?;
        debug!(%user, home = %block.id, "registered user");
        Ok(block)
    }

    /// Create a new block, optionally appended as child to an existing one.
    ///
    /// New blocks always start out inheriting their access. Attaching to a parent requires edit
    /// rights on the parent.
    pub async fn create_block(
        &self,
        user: &UserId,
        new: NewBlock,
        parent: Option<&BlockId>,
    ) -> Result<Block, CanvasError<S::Error>> {
        if let Some(parent) = parent {
            let parent_block = self.existing(parent).await?;
            if !parent_block.is_editable_by(user) {
                return Err(CanvasError::PermissionDenied {
                    user: *user,
                    block: *parent,
                });
            }
        }

        let new = new.access_type(AccessType::Inherited);
        let block = self.call(self.store.insert_block(user, new)).await?;

        if let Some(parent) = parent {
            if !self.call(self.store.add_child(parent, &block.id)).await? {
                // Parent disappeared in the meantime.
                self.call(self.store.delete_block(&block.id)).await?;
                return Err(CanvasError::BlockNotFound(*parent));
            }
            debug!(id = %block.id, %parent, "created block");
        } else {
            debug!(id = %block.id, "created block");
        }

        Ok(block)
    }

    /// Change the contents of a block. Requires edit rights.
    pub async fn update_block(
        &self,
        user: &UserId,
        id: &BlockId,
        patch: BlockPatch,
    ) -> Result<Block, CanvasError<S::Error>> {
        let block = self.existing(id).await?;
        if !block.is_editable_by(user) {
            return Err(CanvasError::PermissionDenied {
                user: *user,
                block: *id,
            });
        }

        self.call(self.store.update_block(id, patch))
            .await?
            .ok_or(CanvasError::BlockNotFound(*id))
    }

    /// Append an existing block as child to another one. Requires edit rights on the parent.
    ///
    /// Returns `false` if the edge already existed.
    pub async fn attach_child(
        &self,
        user: &UserId,
        parent: &BlockId,
        child: &BlockId,
    ) -> Result<bool, CanvasError<S::Error>> {
        let parent_block = self.existing(parent).await?;
        if !parent_block.is_editable_by(user) {
            return Err(CanvasError::PermissionDenied {
                user: *user,
                block: *parent,
            });
        }
        if parent_block.children.contains(child) {
            return Ok(false);
        }
        self.existing(child).await?;

        self.call(self.store.add_child(parent, child)).await
    }

    /// Remove a child from its parent. The child is deleted if no other parent points at it.
    ///
    /// The user needs to be creator or editor of both blocks.
    pub async fn detach_child(
        &self,
        user: &UserId,
        parent: &BlockId,
        child: &BlockId,
    ) -> Result<Detached, CanvasError<S::Error>> {
        for id in [parent, child] {
            let block = self.existing(id).await?;
            if !block.is_managed_by(user) {
                return Err(CanvasError::PermissionDenied {
                    user: *user,
                    block: *id,
                });
            }
        }

        if !self.call(self.store.remove_child(parent, child)).await? {
            return Err(CanvasError::NotAChild {
                parent: *parent,
                child: *child,
            });
        }

        if self.call(self.store.parent_count(child)).await? > 0 {
            debug!(%parent, %child, "detached child");
            return Ok(Detached::Removed);
        }

        self.call(self.store.delete_block(child)).await?;
        debug!(%parent, %child, "detached and deleted orphaned child");
        Ok(Detached::Deleted)
    }

    /// Directly share a block with another user, optionally granting edit rights as well.
    ///
    /// The user needs to be creator or editor of the block.
    pub async fn share(
        &self,
        user: &UserId,
        id: &BlockId,
        grantee: &UserId,
        editable: bool,
    ) -> Result<(), CanvasError<S::Error>> {
        let block = self.existing(id).await?;
        if !block.is_managed_by(user) {
            return Err(CanvasError::PermissionDenied {
                user: *user,
                block: *id,
            });
        }

        self.call(self.store.grant_visible(id, grantee)).await?;
        if editable {
            self.call(self.store.grant_editable(id, grantee)).await?;
        }
        debug!(%id, %grantee, editable, "shared block");
        Ok(())
    }
}
