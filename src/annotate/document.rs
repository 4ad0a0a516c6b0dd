//! Document tree boundary.
//!
//! The editing framework owns the tree, the cursor and change notifications.
//! The engine only talks to it through [`EditorHost`] and
//! [`NotificationSource`]. [`MemoryDocument`] is a complete in-memory host
//! that models the framework's text lifecycle:
//!
//! - user edits inside an entity node turn it back into plain text
//! - adjacent plain nodes are merged after user edits
//! - every mutation queues a notification tagged with the origin set by
//!   [`EditorHost::tag_mutation`]; the tag resets to `User` afterwards

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::annotate::error::AnnotateError;
use crate::annotate::span::{EntityInfo, Segment};

// =============================================================================
// Identifiers and nodes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inline node: a plain text node or an entity node, the persisted form of
/// a [`Segment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineNode {
    pub id: NodeId,
    pub content: Segment,
}

impl InlineNode {
    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn char_len(&self) -> usize {
        self.content.char_len()
    }

    pub fn is_entity(&self) -> bool {
        self.content.is_entity()
    }

    pub fn entity_info(&self) -> Option<EntityInfo> {
        self.content.entity_info()
    }
}

/// Collapsed cursor. `offset` counts codepoints inside `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub node: NodeId,
    pub offset: usize,
}

// =============================================================================
// Notifications
// =============================================================================

/// Who caused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOrigin {
    #[default]
    User,
    Reconciler,
    Navigator,
}

impl MutationOrigin {
    pub fn is_engine(&self) -> bool {
        !matches!(self, MutationOrigin::User)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub affected_blocks: BTreeSet<BlockId>,
    pub origin: MutationOrigin,
}

impl ChangeNotification {
    pub fn new(blocks: impl IntoIterator<Item = BlockId>, origin: MutationOrigin) -> Self {
        Self {
            affected_blocks: blocks.into_iter().collect(),
            origin,
        }
    }

    pub fn user(blocks: impl IntoIterator<Item = BlockId>) -> Self {
        Self::new(blocks, MutationOrigin::User)
    }

    pub fn caused_by_own_mutation(&self) -> bool {
        self.origin.is_engine()
    }
}

// =============================================================================
// Host traits
// =============================================================================

/// Tree and cursor primitives the engine needs from the editing framework.
pub trait EditorHost {
    /// Block ids in document order.
    fn block_ids(&self) -> Vec<BlockId>;

    /// Full text of a block, `None` if the block does not exist.
    fn block_text(&self, block: BlockId) -> Option<String>;

    fn inline_nodes(&self, block: BlockId) -> Option<Vec<InlineNode>>;

    /// Locate a node and its owning block.
    fn node(&self, node: NodeId) -> Option<(BlockId, InlineNode)>;

    /// Replace inline nodes `range` of `block` with one node per segment.
    fn replace_inline_range(
        &mut self,
        block: BlockId,
        range: Range<usize>,
        content: Vec<Segment>,
    ) -> Result<Vec<NodeId>, AnnotateError>;

    /// Tag the next mutation with `origin`.
    fn tag_mutation(&mut self, origin: MutationOrigin);

    fn collapsed_cursor(&self) -> Option<CursorPosition>;

    fn insert_node_after(&mut self, anchor: NodeId, content: Segment) -> Result<NodeId, AnnotateError>;

    fn place_cursor(&mut self, node: NodeId, offset: usize) -> Result<(), AnnotateError>;
}

pub trait NotificationSource {
    /// Notifications queued since the last drain, oldest first.
    fn drain_notifications(&mut self) -> Vec<ChangeNotification>;
}

// =============================================================================
// MemoryDocument
// =============================================================================

#[derive(Debug, Clone)]
struct Block {
    id: BlockId,
    nodes: Vec<InlineNode>,
}

impl Block {
    fn text(&self) -> String {
        self.nodes.iter().map(InlineNode::text).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    blocks: Vec<Block>,
    next_block: u32,
    next_node: u32,
    cursor: Option<CursorPosition>,
    pending_origin: MutationOrigin,
    notifications: Vec<ChangeNotification>,
    mutation_count: u64,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// One plain block per text.
    pub fn from_texts(texts: &[&str]) -> Self {
        let mut doc = Self::new();
        for text in texts {
            doc.append_block(text);
        }
        doc
    }

    /// Number of mutations applied so far, of any origin.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    /// Whole document text, blocks separated by newlines.
    pub fn text(&self) -> String {
        self.blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n")
    }

    pub fn append_block(&mut self, text: &str) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        let mut nodes = Vec::new();
        if !text.is_empty() {
            nodes.push(self.new_node(Segment::plain(text)));
        }
        self.blocks.push(Block { id, nodes });
        self.record_mutation(id);
        id
    }

    pub fn remove_block(&mut self, block: BlockId) -> Result<(), AnnotateError> {
        let idx = self.block_index(block)?;
        let removed = self.blocks.remove(idx);
        if let Some(cursor) = self.cursor {
            if removed.nodes.iter().any(|n| n.id == cursor.node) {
                self.cursor = None;
            }
        }
        self.record_mutation(block);
        Ok(())
    }

    /// Replace a block's content with a single plain node.
    pub fn set_block_text(&mut self, block: BlockId, text: &str) -> Result<(), AnnotateError> {
        let idx = self.block_index(block)?;
        let nodes = if text.is_empty() {
            vec![]
        } else {
            vec![self.new_node(Segment::plain(text))]
        };
        let old = std::mem::replace(&mut self.blocks[idx].nodes, nodes);
        if let Some(cursor) = self.cursor {
            if old.iter().any(|n| n.id == cursor.node) {
                self.cursor = None;
            }
        }
        self.record_mutation(block);
        Ok(())
    }

    /// User typing at `offset` inside `node`. Typing into an entity node
    /// turns it back into plain text. The cursor ends after the inserted text.
    pub fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> Result<(), AnnotateError> {
        let (bi, ni) = self.locate(node)?;
        let current = self.blocks[bi].nodes[ni].text().to_string();
        let len = current.chars().count();
        if offset > len {
            return Err(AnnotateError::OffsetOutOfBounds { node, offset, len });
        }

        let mut edited: String = current.chars().take(offset).collect();
        edited.push_str(text);
        edited.extend(current.chars().skip(offset));
        self.blocks[bi].nodes[ni].content = Segment::plain(edited);

        let caret = self.block_offset(bi, ni) + offset + text.chars().count();
        self.normalize_block(bi);
        self.cursor = self.position_at(bi, caret);
        let id = self.blocks[bi].id;
        self.record_mutation(id);
        Ok(())
    }

    /// User typing at a block-level codepoint `offset`. Reaches blocks with
    /// no nodes yet. At an entity's edge the text goes into the neighbouring
    /// plain node, or a new one, so the entity stays intact.
    pub fn insert_text_at(&mut self, block: BlockId, offset: usize, text: &str) -> Result<(), AnnotateError> {
        let bi = self.block_index(block)?;
        let len: usize = self.blocks[bi].nodes.iter().map(InlineNode::char_len).sum();
        if offset > len {
            return Err(AnnotateError::RangeOutOfBounds { block, range: offset..offset, len });
        }

        let mut target = None;
        let mut slot = self.blocks[bi].nodes.len();
        let mut start = 0usize;
        for (ni, node) in self.blocks[bi].nodes.iter().enumerate() {
            let end = start + node.char_len();
            if !node.is_entity() && start <= offset && offset <= end {
                target = Some((node.id, offset - start));
                break;
            }
            if node.is_entity() && start < offset && offset < end {
                target = Some((node.id, offset - start));
                break;
            }
            if node.is_entity() && offset == start {
                slot = ni;
                break;
            }
            start = end;
        }

        let (node, at) = match target {
            Some(found) => found,
            None => {
                let fresh = self.new_node(Segment::plain(""));
                let id = fresh.id;
                self.blocks[bi].nodes.insert(slot, fresh);
                (id, 0)
            }
        };
        self.insert_text(node, at, text)
    }

    /// User deletion of codepoints `start..end` inside `node`.
    pub fn delete_text(&mut self, node: NodeId, start: usize, end: usize) -> Result<(), AnnotateError> {
        let (bi, ni) = self.locate(node)?;
        let current = self.blocks[bi].nodes[ni].text().to_string();
        let len = current.chars().count();
        if start > end || end > len {
            return Err(AnnotateError::OffsetOutOfBounds { node, offset: end, len });
        }

        let edited: String = current
            .chars()
            .enumerate()
            .filter(|(i, _)| *i < start || *i >= end)
            .map(|(_, c)| c)
            .collect();
        self.blocks[bi].nodes[ni].content = Segment::plain(edited);

        let caret = self.block_offset(bi, ni) + start;
        self.normalize_block(bi);
        self.cursor = self.position_at(bi, caret);
        let id = self.blocks[bi].id;
        self.record_mutation(id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn new_node(&mut self, content: Segment) -> InlineNode {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        InlineNode { id, content }
    }

    fn record_mutation(&mut self, block: BlockId) {
        let origin = std::mem::take(&mut self.pending_origin);
        self.mutation_count += 1;
        self.notifications.push(ChangeNotification::new([block], origin));
    }

    fn block_index(&self, block: BlockId) -> Result<usize, AnnotateError> {
        self.blocks
            .iter()
            .position(|b| b.id == block)
            .ok_or(AnnotateError::UnknownBlock(block))
    }

    fn locate(&self, node: NodeId) -> Result<(usize, usize), AnnotateError> {
        for (bi, block) in self.blocks.iter().enumerate() {
            if let Some(ni) = block.nodes.iter().position(|n| n.id == node) {
                return Ok((bi, ni));
            }
        }
        Err(AnnotateError::UnknownNode(node))
    }

    /// Codepoint offset of node `ni` from the start of block `bi`.
    fn block_offset(&self, bi: usize, ni: usize) -> usize {
        self.blocks[bi].nodes[..ni].iter().map(InlineNode::char_len).sum()
    }

    /// Cursor for a block-level codepoint offset; the earliest node wins at edges.
    fn position_at(&self, bi: usize, offset: usize) -> Option<CursorPosition> {
        let mut start = 0usize;
        for node in &self.blocks[bi].nodes {
            let len = node.char_len();
            if offset <= start + len {
                return Some(CursorPosition { node: node.id, offset: offset - start });
            }
            start += len;
        }
        None
    }

    /// Drop empty plain nodes and merge adjacent plain nodes.
    fn normalize_block(&mut self, bi: usize) {
        let nodes = std::mem::take(&mut self.blocks[bi].nodes);
        let mut merged: Vec<InlineNode> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !node.is_entity() && node.text().is_empty() {
                continue;
            }
            if let Some(prev) = merged.last_mut() {
                if !prev.is_entity() && !node.is_entity() {
                    let joined = format!("{}{}", prev.text(), node.text());
                    prev.content = Segment::plain(joined);
                    continue;
                }
            }
            merged.push(node);
        }
        self.blocks[bi].nodes = merged;
    }
}

impl EditorHost for MemoryDocument {
    fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id).collect()
    }

    fn block_text(&self, block: BlockId) -> Option<String> {
        self.blocks.iter().find(|b| b.id == block).map(Block::text)
    }

    fn inline_nodes(&self, block: BlockId) -> Option<Vec<InlineNode>> {
        self.blocks.iter().find(|b| b.id == block).map(|b| b.nodes.clone())
    }

    fn node(&self, node: NodeId) -> Option<(BlockId, InlineNode)> {
        let (bi, ni) = self.locate(node).ok()?;
        Some((self.blocks[bi].id, self.blocks[bi].nodes[ni].clone()))
    }

    fn replace_inline_range(
        &mut self,
        block: BlockId,
        range: Range<usize>,
        content: Vec<Segment>,
    ) -> Result<Vec<NodeId>, AnnotateError> {
        let bi = self.block_index(block)?;
        let len = self.blocks[bi].nodes.len();
        if range.start > range.end || range.end > len {
            return Err(AnnotateError::RangeOutOfBounds { block, range, len });
        }

        // Cursor offset relative to the start of the replaced range.
        let relative_cursor = self.cursor.and_then(|cursor| {
            let replaced = &self.blocks[bi].nodes[range.clone()];
            let mut before = 0usize;
            for node in replaced {
                if node.id == cursor.node {
                    return Some(before + cursor.offset);
                }
                before += node.char_len();
            }
            None
        });

        let new_nodes: Vec<InlineNode> = content.into_iter().map(|c| self.new_node(c)).collect();
        let ids: Vec<NodeId> = new_nodes.iter().map(|n| n.id).collect();

        if let Some(relative) = relative_cursor {
            let mut start = 0usize;
            self.cursor = None;
            for node in &new_nodes {
                let node_len = node.char_len();
                if relative <= start + node_len {
                    self.cursor = Some(CursorPosition { node: node.id, offset: relative - start });
                    break;
                }
                start += node_len;
            }
        }

        self.blocks[bi].nodes.splice(range, new_nodes);
        self.record_mutation(block);
        Ok(ids)
    }

    fn tag_mutation(&mut self, origin: MutationOrigin) {
        self.pending_origin = origin;
    }

    fn collapsed_cursor(&self) -> Option<CursorPosition> {
        self.cursor
    }

    fn insert_node_after(&mut self, anchor: NodeId, content: Segment) -> Result<NodeId, AnnotateError> {
        let (bi, ni) = self.locate(anchor)?;
        let node = self.new_node(content);
        let id = node.id;
        self.blocks[bi].nodes.insert(ni + 1, node);
        let block = self.blocks[bi].id;
        self.record_mutation(block);
        Ok(id)
    }

    fn place_cursor(&mut self, node: NodeId, offset: usize) -> Result<(), AnnotateError> {
        let (bi, ni) = self.locate(node)?;
        let len = self.blocks[bi].nodes[ni].char_len();
        if offset > len {
            return Err(AnnotateError::OffsetOutOfBounds { node, offset, len });
        }
        self.cursor = Some(CursorPosition { node, offset });
        Ok(())
    }
}

impl NotificationSource for MemoryDocument {
    fn drain_notifications(&mut self) -> Vec<ChangeNotification> {
        std::mem::take(&mut self.notifications)
    }
}

// =============================================================================
// Tests
// =============================================================================
