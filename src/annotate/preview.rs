//! Hover preview: what an entity node is and where else it is mentioned.

use serde::{Deserialize, Serialize};

use crate::annotate::document::{BlockId, EditorHost, NodeId};
use crate::annotate::knowledge::KnowledgeBase;
use crate::annotate::span::EntityInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedBlock {
    pub block: BlockId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPreview {
    pub entity: EntityInfo,
    /// Other blocks mentioning the entity, in document order.
    pub related: Vec<RelatedBlock>,
}

impl EntityPreview {
    /// `None` when there are no other mentions.
    pub fn mention_label(&self) -> Option<String> {
        match self.related.len() {
            0 => None,
            1 => Some("Mentioned in 1 block".to_string()),
            n => Some(format!("Mentioned in {} blocks", n)),
        }
    }
}

/// Entity metadata of `node`, `None` for plain or unknown nodes.
pub fn resolve_entity_at<H: EditorHost + ?Sized>(host: &H, node: NodeId) -> Option<EntityInfo> {
    host.node(node).and_then(|(_, n)| n.entity_info())
}

/// Blocks whose text contains the canonical name, or an alias of a record
/// with that canonical name, ignoring case.
pub fn find_mentions<H, K>(host: &H, kb: &K, canonical_name: &str, excluding: Option<BlockId>) -> Vec<BlockId>
where
    H: EditorHost + ?Sized,
    K: KnowledgeBase + ?Sized,
{
    let mut needles: Vec<String> = vec![canonical_name.to_lowercase()];
    for record in kb.records_named(canonical_name) {
        needles.extend(record.aliases.iter().map(|a| a.to_lowercase()));
    }
    needles.retain(|n| !n.is_empty());
    needles.dedup();
    if needles.is_empty() {
        return vec![];
    }

    host.block_ids()
        .into_iter()
        .filter(|&block| Some(block) != excluding)
        .filter(|&block| {
            host.block_text(block)
                .map(|text| {
                    let text = text.to_lowercase();
                    needles.iter().any(|n| text.contains(n.as_str()))
                })
                .unwrap_or(false)
        })
        .collect()
}

/// Preview card for the entity node `node`; the node's own block is excluded.
pub fn build_preview<H, K>(host: &H, kb: &K, node: NodeId) -> Option<EntityPreview>
where
    H: EditorHost + ?Sized,
    K: KnowledgeBase + ?Sized,
{
    let (own_block, inline) = host.node(node)?;
    let entity = inline.entity_info()?;
    let related = find_mentions(host, kb, &entity.canonical_name, Some(own_block))
        .into_iter()
        .filter_map(|block| host.block_text(block).map(|text| RelatedBlock { block, text }))
        .collect();
    Some(EntityPreview { entity, related })
}
