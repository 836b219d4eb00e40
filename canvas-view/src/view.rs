// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat, serializable representation of resolved blocks.
use std::collections::BTreeMap;

use canvas_core::{AccessType, BlockId, Layout, Timestamp, UserId};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::aggregate::AggregatedRecord;

/// A resolved block as handed out to clients.
///
/// JSON payloads stored as text are decoded here. A payload which fails to decode is left out of
/// the serialized form, a payload which was never stored is reported as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockView {
    pub id: BlockId,
    pub paths: Vec<String>,
    pub creator_id: UserId,
    pub direct_status: AccessType,
    pub effective_status: AccessType,
    pub text: Option<String>,

    #[serde(rename = "content_classList", skip_serializing_if = "Option::is_none")]
    pub content_class_list: Option<Value>,

    #[serde(rename = "classList", skip_serializing_if = "Option::is_none")]
    pub class_list: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_position: Option<Value>,

    pub layout: Layout,
    pub color: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,

    pub is_fully_loaded: bool,
    pub children: Vec<BlockId>,
    pub is_ambiguous: bool,
}

impl BlockView {
    pub fn from_record(record: &AggregatedRecord) -> Self {
        let block = &record.block;
        let summary = &record.summary;

        Self {
            id: block.id,
            paths: summary.path_strings(),
            creator_id: block.creator_id,
            direct_status: block.access_type,
            effective_status: summary.effective_access(),
            text: block.text.clone(),
            content_class_list: decode(
                block.id,
                "content_class_list",
                block.content_class_list.as_deref(),
            ),
            class_list: decode(block.id, "class_list", block.class_list.as_deref()),
            children_position: decode(
                block.id,
                "children_position",
                block.children_position.as_deref(),
            ),
            layout: block.layout,
            color: summary.color().to_string(),
            created_at: block.created_at,
            updated_at: block.updated_at,
            properties: decode(block.id, "properties", block.properties.as_deref()),
            is_fully_loaded: summary.is_fully_loaded(),
            children: record.first_level_children().to_vec(),
            is_ambiguous: summary.is_ambiguous(),
        }
    }
}

fn decode(id: BlockId, field: &'static str, raw: Option<&str>) -> Option<Value> {
    let Some(raw) = raw else {
        return Some(Value::Null);
    };

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%id, field, %err, "failed decoding stored json payload");
            None
        }
    }
}

/// Turn aggregated records into views, keyed by block id.
pub fn assemble(records: &BTreeMap<BlockId, AggregatedRecord>) -> BTreeMap<BlockId, BlockView> {
    records
        .iter()
        .map(|(id, record)| (*id, BlockView::from_record(record)))
        .collect()
}
