// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for the block graph.
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use canvas_core::{Block, BlockId};

/// Blocks keyed by their id. Edges live in the `children` list of every block.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    pub(crate) blocks: BTreeMap<BlockId, Block>,
    pub(crate) last_id: i64,
}

impl InnerMemoryStore {
    pub(crate) fn next_id(&mut self) -> BlockId {
        self.last_id += 1;
        BlockId::new(self.last_id)
    }
}

/// An in-memory store for the block graph.
///
/// This does not persist data permamently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// `MemoryStore` supports usage in asynchronous and multi-threaded contexts by wrapping an
/// `InnerMemoryStore` with an `RwLock` and `Arc`. Every cloned instance shares the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }
}

// Trait implementations are in the regarding modules, see `blocks`.
