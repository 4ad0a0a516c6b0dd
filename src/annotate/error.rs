//! Error type for the annotation engine.
//!
//! None of these reach end users. A failed pass leaves the block as it was
//! and the next successful pass annotates it.

use std::ops::Range;

use crate::annotate::document::{BlockId, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotateError {
    /// Rebuilt segment text differs from the scanned text. Engine defect.
    ContentMismatch {
        block: Option<BlockId>,
        expected: String,
        rebuilt: String,
    },
    UnknownBlock(BlockId),
    UnknownNode(NodeId),
    RangeOutOfBounds {
        block: BlockId,
        range: Range<usize>,
        len: usize,
    },
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    InvalidKnowledgeBase(String),
    InvalidConfig(String),
    /// The conductor has no knowledge base yet.
    NotHydrated,
}

impl std::fmt::Display for AnnotateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotateError::ContentMismatch { block, expected, rebuilt } => match block {
                Some(id) => write!(
                    f,
                    "content mismatch in block {}: expected {:?}, rebuilt {:?}",
                    id, expected, rebuilt
                ),
                None => write!(f, "content mismatch: expected {:?}, rebuilt {:?}", expected, rebuilt),
            },
            AnnotateError::UnknownBlock(id) => write!(f, "unknown block: {}", id),
            AnnotateError::UnknownNode(id) => write!(f, "unknown node: {}", id),
            AnnotateError::RangeOutOfBounds { block, range, len } => write!(
                f,
                "inline range {}..{} out of bounds for block {} with {} nodes",
                range.start, range.end, block, len
            ),
            AnnotateError::OffsetOutOfBounds { node, offset, len } => write!(
                f,
                "offset {} out of bounds for node {} of length {}",
                offset, node, len
            ),
            AnnotateError::InvalidKnowledgeBase(msg) => write!(f, "invalid knowledge base: {}", msg),
            AnnotateError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            AnnotateError::NotHydrated => write!(f, "knowledge base not hydrated"),
        }
    }
}

impl std::error::Error for AnnotateError {}
