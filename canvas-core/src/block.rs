// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AccessType, BlockId, Layout, Timestamp, UserId};

const DEFAULT_CONTENT_CLASS_LIST: &str = r#"["grid-row_1","grid-column_1-M1"]"#;

const DEFAULT_CLASS_LIST: &str = r#"["grid-template-columns_1fr","grid-template-rows_1fr"]"#;

const EMPTY_OBJECT: &str = "{}";

/// A node in the block graph as it is persisted.
///
/// The JSON-typed payloads (`children_position`, `class_list`, `content_class_list` and
/// `properties`) are kept in their stored textual form and only decoded when a view is assembled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub creator_id: UserId,
    pub access_type: AccessType,
    pub visible_user_ids: BTreeSet<UserId>,
    pub editable_user_ids: BTreeSet<UserId>,

    /// Outgoing edges in their stored order.
    pub children: Vec<BlockId>,

    pub children_position: Option<String>,
    pub class_list: Option<String>,
    pub content_class_list: Option<String>,
    pub layout: Layout,
    pub color: Option<String>,
    pub text: Option<String>,
    pub properties: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Block {
    /// Materialise a new block from its creation payload.
    pub fn from_new(id: BlockId, creator_id: UserId, new: NewBlock, now: Timestamp) -> Self {
        Self {
            id,
            creator_id,
            access_type: new.access_type,
            // Creators can always see and edit what they've made.
            visible_user_ids: BTreeSet::from([creator_id]),
            editable_user_ids: BTreeSet::from([creator_id]),
            children: Vec::new(),
            children_position: new.children_position,
            class_list: new.class_list,
            content_class_list: new.content_class_list,
            layout: new.layout,
            color: new.color,
            text: new.text,
            properties: new.properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the block was directly shared with this user.
    pub fn is_visible_to(&self, user: &UserId) -> bool {
        self.visible_user_ids.contains(user)
    }

    /// Returns `true` if this block can serve as the root of a view for the given user.
    ///
    /// Public blocks are roots for everyone. All other blocks, `public_editable` ones included,
    /// are roots only for users they were directly shared with.
    pub fn is_root_visible_to(&self, user: &UserId) -> bool {
        match self.access_type {
            AccessType::Public => true,
            AccessType::PublicEditable | AccessType::Private | AccessType::Inherited => {
                self.is_visible_to(user)
            }
        }
    }

    /// Returns `true` if the user may change the contents of this block.
    pub fn is_editable_by(&self, user: &UserId) -> bool {
        self.access_type == AccessType::PublicEditable || self.editable_user_ids.contains(user)
    }

    /// Returns `true` if the user may restructure this block, that is detach or delete it.
    pub fn is_managed_by(&self, user: &UserId) -> bool {
        &self.creator_id == user || self.editable_user_ids.contains(user)
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: BlockPatch, now: Timestamp) {
        if let Some(access_type) = patch.access_type {
            self.access_type = access_type;
        }
        if let Some(children) = patch.children {
            // Edges form a set, the first occurrence defines the position.
            let mut seen = BTreeSet::new();
            self.children = children
                .into_iter()
                .filter(|child| seen.insert(*child))
                .collect();
        }
        if let Some(children_position) = patch.children_position {
            self.children_position = Some(children_position);
        }
        if let Some(class_list) = patch.class_list {
            self.class_list = Some(class_list);
        }
        if let Some(content_class_list) = patch.content_class_list {
            self.content_class_list = Some(content_class_list);
        }
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(color) = patch.color {
            self.color = Some(color);
        }
        if let Some(text) = patch.text {
            self.text = Some(text);
        }
        if let Some(properties) = patch.properties {
            self.properties = Some(properties);
        }
        self.updated_at = now;
    }
}

/// Payload to create a new block with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBlock {
    pub access_type: AccessType,
    pub children_position: Option<String>,
    pub class_list: Option<String>,
    pub content_class_list: Option<String>,
    pub layout: Layout,
    pub color: Option<String>,
    pub text: Option<String>,
    pub properties: Option<String>,
}

impl Default for NewBlock {
    fn default() -> Self {
        Self {
            access_type: AccessType::Inherited,
            children_position: Some(EMPTY_OBJECT.to_string()),
            class_list: Some(DEFAULT_CLASS_LIST.to_string()),
            content_class_list: Some(DEFAULT_CONTENT_CLASS_LIST.to_string()),
            layout: Layout::Default,
            color: None,
            text: Some(String::new()),
            properties: Some(EMPTY_OBJECT.to_string()),
        }
    }
}

impl NewBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn properties(mut self, properties: &str) -> Self {
        self.properties = Some(properties.to_string());
        self
    }
}

/// Partial update of a block. Fields set to `None` are left untouched.
///
/// Setting `children` replaces the whole ordered list of outgoing edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub access_type: Option<AccessType>,
    pub children: Option<Vec<BlockId>>,
    pub children_position: Option<String>,
    pub class_list: Option<String>,
    pub content_class_list: Option<String>,
    pub layout: Option<Layout>,
    pub color: Option<String>,
    pub text: Option<String>,
    pub properties: Option<String>,
}
