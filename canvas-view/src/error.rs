// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;
use std::time::Duration;

use canvas_core::{BlockId, UserId};
use thiserror::Error;

/// Errors which can occur when resolving views or changing blocks.
///
/// A root which is missing or not visible is not an error, it results in an empty view instead.
#[derive(Debug, Error)]
pub enum CanvasError<E>
where
    E: Error + 'static,
{
    /// The underlying store failed, the call could not be completed.
    #[error("block store unavailable: {0}")]
    StoreUnavailable(#[source] E),

    /// The underlying store did not answer in time.
    #[error("block store did not respond within {0:?}")]
    StoreTimeout(Duration),

    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("block {child} is not a child of block {parent}")]
    NotAChild { parent: BlockId, child: BlockId },

    #[error("user {user} is not allowed to change block {block}")]
    PermissionDenied { user: UserId, block: BlockId },
}
