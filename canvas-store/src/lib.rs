// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the block graph of a canvas.
//!
//! Blocks and their parent-to-child edges are kept in two separate relations: a block is an entry
//! in a table keyed by its id and an edge is a row pointing from one id to another. Nothing here
//! assumes a tree, a block can have any number of parents.
//!
//! `canvas-store` offers read- and write-only trait interfaces, [`BlockStore`] and
//! [`WritableBlockStore`], and two concrete implementations:
//!
//! - `MemoryStore` keeps everything in memory behind a lock, enabled with the `memory` feature.
//! - `SqliteStore` persists blocks in an SQLite database via `sqlx`, enabled with the `sqlite`
//!   feature.
//!
//! Read methods are designed around the access resolution engine in `canvas-view`: it loads the
//! root of a view with [`BlockStore::fetch_root`] and then one breadth-first level at a time with
//! [`BlockStore::fetch_children_batch`].
pub mod blocks;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
mod test_utils;

pub use blocks::{BlockStore, WritableBlockStore};
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
