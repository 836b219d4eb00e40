// SPDX-License-Identifier: MIT OR Apache-2.0

//! `BlockStore` and `WritableBlockStore` traits for reading and mutating the block graph as well
//! as their concrete implementations.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use traits::{BlockStore, WritableBlockStore};
