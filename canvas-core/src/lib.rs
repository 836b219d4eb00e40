// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types for a canvas of nested blocks.
//!
//! Blocks form a directed graph: every block can have many children and many parents. Each block
//! carries its own access setting and a set of users it was directly shared with. An `inherited`
//! access setting defers to whatever was resolved for the path used to reach the block, see
//! `canvas-view` for the resolution engine.
mod access;
mod block;
mod id;
pub mod timestamp;

pub use access::{AccessType, Layout, ParseError};
pub use block::{Block, BlockPatch, NewBlock};
pub use id::{BlockId, UserId};
pub use timestamp::Timestamp;
