//! BlockFingerprints: content-addressable skip detection per block.
//!
//! The fingerprint covers the block's inline structure, not just its text:
//! a block whose entity node was demoted back to plain text has the same
//! text but a different fingerprint, and must be rescanned.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::annotate::document::{BlockId, InlineNode};

/// Result of a fingerprint check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintCheck {
    pub unchanged: bool,
    pub fingerprint: u64,
    pub recorded: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockFingerprints {
    /// Fingerprint after the last completed pass, per block
    recorded: HashMap<BlockId, u64>,
    check_count: u64,
    skip_count: u64,
}

impl BlockFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash of the (kind, text, entity) sequence of a block.
    pub fn fingerprint(nodes: &[InlineNode]) -> u64 {
        let mut hasher = DefaultHasher::new();
        nodes.len().hash(&mut hasher);
        for node in nodes {
            node.content.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Compare `nodes` with the fingerprint recorded for `block`.
    pub fn check(&mut self, block: BlockId, nodes: &[InlineNode]) -> FingerprintCheck {
        self.check_count += 1;
        let fingerprint = Self::fingerprint(nodes);
        let recorded = self.recorded.get(&block).copied();
        let unchanged = recorded == Some(fingerprint);
        if unchanged {
            self.skip_count += 1;
        }
        FingerprintCheck { unchanged, fingerprint, recorded }
    }

    pub fn record(&mut self, block: BlockId, nodes: &[InlineNode]) {
        self.recorded.insert(block, Self::fingerprint(nodes));
    }

    pub fn forget(&mut self, block: BlockId) {
        self.recorded.remove(&block);
    }

    /// Get skip rate as percentage
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn check_count(&self) -> u64 {
        self.check_count
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    /// Forget every block and zero the counters.
    pub fn reset(&mut self) {
        self.recorded.clear();
        self.check_count = 0;
        self.skip_count = 0;
    }
}
