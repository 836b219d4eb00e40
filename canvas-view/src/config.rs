// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use canvas_core::{BlockId, UserId};

/// Default number of levels below the root which are reached during a traversal.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Color reported for blocks when neither they nor any of their ancestors define one.
pub const DEFAULT_COLOR: &str = "default_color";

/// Well-known public block shown to anonymous visitors, viewed with the identity of its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FallbackRoot {
    pub block_id: BlockId,
    pub user_id: UserId,
}

impl Default for FallbackRoot {
    fn default() -> Self {
        Self {
            block_id: BlockId::new(2),
            user_id: UserId::new(2),
        }
    }
}

/// Configuration for resolving views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    /// Depth of the deepest level reached from the root. Blocks on this level are reported but
    /// their children are not.
    pub max_depth: usize,

    pub default_color: String,

    pub fallback_root: FallbackRoot,

    /// Upper bound for every single store call, `None` waits forever.
    pub store_timeout: Option<Duration>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_color: DEFAULT_COLOR.to_string(),
            fallback_root: FallbackRoot::default(),
            store_timeout: None,
        }
    }
}

impl ViewConfig {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn default_color(mut self, color: &str) -> Self {
        self.default_color = color.to_string();
        self
    }

    pub fn fallback_root(mut self, block_id: BlockId, user_id: UserId) -> Self {
        self.fallback_root = FallbackRoot { block_id, user_id };
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }
}
