// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical access resolution over a canvas of nested blocks.
//!
//! Blocks form a directed graph where every block can be reached along many paths. Blocks with an
//! `inherited` access setting take over whatever was resolved on the path leading to them, so the
//! same block can be public along one path and private along another.
//!
//! Resolving a view happens in three stages:
//!
//! 1. [`traverse`] walks the graph breadth-first from a root up to a configured depth, producing
//!    one record per block and path with its resolved access, inherited color and a flag telling
//!    if access along this path could be proven.
//! 2. [`aggregate`] folds all records of a block into one, keeping every path.
//! 3. [`assemble`] turns these into flat, serializable [`BlockView`]s.
//!
//! [`Canvas`] bundles these stages with a [`BlockStore`](canvas_store::BlockStore) and
//! additionally offers operations to create and restructure blocks on behalf of a user.
//!
//! ## Example
//!
//! ```
//! # use canvas_core::{AccessType, NewBlock, UserId};
//! # use canvas_store::{MemoryStore, WritableBlockStore};
//! # use canvas_view::Canvas;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = UserId::new(1);
//! let canvas = Canvas::new(MemoryStore::new());
//!
//! let home = canvas.register_user(&alice, "alice").await?;
//! let note = canvas
//!     .create_block(&alice, NewBlock::new().text("hello"), Some(&home.id))
//!     .await?;
//!
//! let view = canvas.resolve_home_view(Some(&alice)).await?;
//! assert_eq!(view.blocks.len(), 2);
//! assert_eq!(view.blocks[&note.id].effective_status, AccessType::Private);
//! # Ok(())
//! # }
//! ```
pub mod access;
pub mod aggregate;
mod canvas;
mod config;
mod error;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
pub mod traversal;
pub mod view;

pub use access::{Resolution, resolve};
pub use aggregate::{AggregatedRecord, PathSummary, aggregate, reduce};
pub use canvas::{Canvas, Detached, ViewResponse, ViewStatus};
pub use config::{DEFAULT_COLOR, DEFAULT_MAX_DEPTH, FallbackRoot, ViewConfig};
pub use error::CanvasError;
pub use traversal::{Traversal, TraversalRecord, traverse};
pub use view::{BlockView, assemble};
