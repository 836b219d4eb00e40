// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers to build block graphs and misbehaving stores in tests.
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use canvas_core::{AccessType, Block, BlockId, NewBlock, UserId};
use canvas_store::{BlockStore, WritableBlockStore};
use thiserror::Error;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Create a block with default payload and the given access setting.
pub async fn create<S>(store: &S, creator: UserId, access_type: AccessType) -> BlockId
where
    S: WritableBlockStore,
{
    store
        .insert_block(&creator, NewBlock::new().access_type(access_type))
        .await
        .expect("insert block")
        .id
}

/// Append an edge from parent to child.
pub async fn link<S>(store: &S, parent: BlockId, child: BlockId)
where
    S: WritableBlockStore,
{
    let created = store.add_child(&parent, &child).await.expect("add edge");
    assert!(created, "edge {parent} -> {child} was not created");
}

/// Create a chain of `len` blocks, each one the only child of the previous one.
///
/// The first block has the given access setting, all following ones inherit.
pub async fn chain<S>(
    store: &S,
    creator: UserId,
    access_type: AccessType,
    len: usize,
) -> Vec<BlockId>
where
    S: WritableBlockStore,
{
    let mut ids = Vec::with_capacity(len);
    for index in 0..len {
        let access_type = if index == 0 {
            access_type
        } else {
            AccessType::Inherited
        };
        let id = create(store, creator, access_type).await;
        if let Some(parent) = ids.last() {
            link(store, *parent, id).await;
        }
        ids.push(id);
    }
    ids
}

#[derive(Debug, Error)]
pub enum FaultyStoreError<E>
where
    E: Error + 'static,
{
    #[error("store is offline")]
    Offline,

    #[error(transparent)]
    Inner(E),
}

/// Wraps a store to inject failures, delays and disappearing blocks, and records every batch
/// request it serves.
#[derive(Clone, Debug)]
pub struct FaultyStore<S> {
    inner: S,
    offline: bool,
    delay: Option<Duration>,

    /// Blocks which are reported as children of their parents but are gone as soon as they're
    /// requested themselves.
    vanished: BTreeSet<BlockId>,

    batches: Arc<Mutex<Vec<Vec<BlockId>>>>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            offline: false,
            delay: None,
            vanished: BTreeSet::new(),
            batches: Arc::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Wait before answering every call.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn vanish(mut self, id: BlockId) -> Self {
        self.vanished.insert(id);
        self
    }

    /// Ids of every children batch requested so far.
    pub fn batches(&self) -> Vec<Vec<BlockId>> {
        self.batches.lock().expect("acquire batches lock").clone()
    }
}

impl<S> FaultyStore<S>
where
    S: BlockStore,
{
    async fn check(&self) -> Result<(), FaultyStoreError<S::Error>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline {
            return Err(FaultyStoreError::Offline);
        }
        Ok(())
    }
}

impl<S> BlockStore for FaultyStore<S>
where
    S: BlockStore,
{
    type Error = FaultyStoreError<S::Error>;

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>, Self::Error> {
        self.check().await?;
        if self.vanished.contains(id) {
            return Ok(None);
        }
        self.inner.get_block(id).await.map_err(FaultyStoreError::Inner)
    }

    async fn fetch_children_batch(
        &self,
        ids: &[BlockId],
    ) -> Result<HashMap<BlockId, Vec<Block>>, Self::Error> {
        self.check().await?;
        self.batches
            .lock()
            .expect("acquire batches lock")
            .push(ids.to_vec());

        let mut batch = self
            .inner
            .fetch_children_batch(ids)
            .await
            .map_err(FaultyStoreError::Inner)?;
        batch.retain(|id, _| !self.vanished.contains(id));
        Ok(batch)
    }

    async fn root_block_of(&self, user: &UserId) -> Result<Option<BlockId>, Self::Error> {
        self.check().await?;
        self.inner
            .root_block_of(user)
            .await
            .map_err(FaultyStoreError::Inner)
    }

    async fn parent_count(&self, id: &BlockId) -> Result<usize, Self::Error> {
        self.check().await?;
        self.inner
            .parent_count(id)
            .await
            .map_err(FaultyStoreError::Inner)
    }
}
