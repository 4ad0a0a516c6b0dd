//! Reconciler: keep a document's entity nodes in sync with its plain text.
//!
//! # Loop guarding
//! 1. Notifications tagged as engine mutations are ignored.
//! 2. Only plain inline nodes are scan candidates. An entity node is never
//!    rescanned or split here; it returns to plain text only through the
//!    editing framework's own text lifecycle.
//! 3. Each block gets at most `max_passes_per_block` passes per update cycle.
//!
//! # Writes
//! Everything a pass changes in a block is computed and verified first, then
//! written as one range replacement, so a failed pass leaves the block
//! untouched. Plain runs are rescanned until stable before writing, so the
//! written structure is a fixed point: a later pass over it changes nothing.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::annotate::config::{ReconcilerConfig, ScanGranularity};
use crate::annotate::diagnostics;
use crate::annotate::document::{BlockId, ChangeNotification, EditorHost, InlineNode, MutationOrigin};
use crate::annotate::error::AnnotateError;
use crate::annotate::fingerprint::BlockFingerprints;
use crate::annotate::pipeline::Segmenter;
use crate::annotate::scheduler::{ScanScheduler, Scheduled};
use crate::annotate::span::{is_unchanged, verify_content, Segment};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub notifications_seen: u64,
    pub notifications_ignored: u64,
    pub scheduled: u64,
    pub superseded: u64,
    pub cancelled: u64,
    pub passes: u64,
    pub mutations: u64,
    pub skipped_unchanged: u64,
    pub skipped_missing: u64,
    pub consistency_failures: u64,
    pub breaker_trips: u64,
}

/// What a pass did to one block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// The block no longer exists or has no text.
    Missing,
    /// Same structure as after the last completed pass.
    Unchanged,
    /// Scanned, nothing to annotate.
    NoOp,
    /// `replaced` plain nodes were rewritten, in one write.
    Annotated { replaced: usize },
    Failed(AnnotateError),
    BreakerTripped,
}

type Replacement = (Range<usize>, Vec<Segment>);

// =============================================================================
// Reconciler
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
    scheduler: ScanScheduler,
    fingerprints: BlockFingerprints,
    passes_this_cycle: HashMap<BlockId, u32>,
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    pub fn fingerprints(&self) -> &BlockFingerprints {
        &self.fingerprints
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.pending_len() > 0
    }

    pub fn is_pending(&self, block: BlockId) -> bool {
        self.scheduler.is_pending(block)
    }

    /// Start a new logical update; resets the per-block pass budget.
    pub fn begin_cycle(&mut self) {
        self.passes_this_cycle.clear();
    }

    /// Forget what earlier passes recorded, e.g. after the knowledge base changed.
    pub fn reset_fingerprints(&mut self) {
        self.fingerprints.reset();
    }

    /// Schedule scans for the blocks a notification touches.
    pub fn on_change<H: EditorHost + ?Sized>(&mut self, host: &H, note: &ChangeNotification) {
        self.stats.notifications_seen += 1;
        if note.caused_by_own_mutation() {
            self.stats.notifications_ignored += 1;
            return;
        }

        for &block in &note.affected_blocks {
            if host.block_text(block).is_none() {
                self.fingerprints.forget(block);
                if self.scheduler.cancel(block) {
                    self.stats.cancelled += 1;
                    diagnostics::debug(&format!("cancelled scan for removed block {}", block));
                }
                continue;
            }
            self.stats.scheduled += 1;
            if let Scheduled::Superseded { previous, ticket } = self.scheduler.schedule(block) {
                self.stats.superseded += 1;
                diagnostics::debug(&format!("block {}: scan {} superseded by {}", block, previous, ticket));
            }
        }
    }

    /// Run every pending scan.
    pub fn flush<H, S>(&mut self, host: &mut H, segmenter: &S) -> Vec<(BlockId, BlockOutcome)>
    where
        H: EditorHost + ?Sized,
        S: Segmenter + ?Sized,
    {
        self.scheduler
            .take_due()
            .into_iter()
            .map(|(block, _)| (block, self.reconcile_block(host, segmenter, block)))
            .collect()
    }

    /// One pass over one block.
    pub fn reconcile_block<H, S>(&mut self, host: &mut H, segmenter: &S, block: BlockId) -> BlockOutcome
    where
        H: EditorHost + ?Sized,
        S: Segmenter + ?Sized,
    {
        let passes = self.passes_this_cycle.entry(block).or_insert(0);
        *passes += 1;
        if *passes > self.config.max_passes_per_block {
            self.stats.breaker_trips += 1;
            diagnostics::warn(&format!(
                "block {}: pass limit of {} reached in one update, skipping",
                block, self.config.max_passes_per_block
            ));
            return BlockOutcome::BreakerTripped;
        }
        self.stats.passes += 1;

        let nodes = match host.inline_nodes(block) {
            Some(nodes) => nodes,
            None => {
                self.stats.skipped_missing += 1;
                diagnostics::debug(&format!("block {}: no text, pass skipped", block));
                return BlockOutcome::Missing;
            }
        };

        if self.fingerprints.check(block, &nodes).unchanged {
            self.stats.skipped_unchanged += 1;
            return BlockOutcome::Unchanged;
        }

        let plan = match self.config.granularity {
            ScanGranularity::Node => self.plan_nodes(segmenter, block, &nodes),
            ScanGranularity::Block => self.plan_block(segmenter, block, &nodes),
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                self.stats.consistency_failures += 1;
                diagnostics::error(&format!("block {}: annotation aborted: {}", block, e));
                return BlockOutcome::Failed(e);
            }
        };

        let replaced = plan.len();
        let (range, content) = match combine(&nodes, plan) {
            Some(write) => write,
            None => {
                self.fingerprints.record(block, &nodes);
                return BlockOutcome::NoOp;
            }
        };

        host.tag_mutation(MutationOrigin::Reconciler);
        if let Err(e) = host.replace_inline_range(block, range, content) {
            // Nothing was written; the tag must not leak onto the next user edit.
            host.tag_mutation(MutationOrigin::User);
            self.fingerprints.forget(block);
            diagnostics::error(&format!("block {}: replace failed: {}", block, e));
            return BlockOutcome::Failed(e);
        }
        self.stats.mutations += 1;

        if let Some(after) = host.inline_nodes(block) {
            self.fingerprints.record(block, &after);
        }
        BlockOutcome::Annotated { replaced }
    }

    /// Each plain node on its own.
    fn plan_nodes<S: Segmenter + ?Sized>(
        &self,
        segmenter: &S,
        block: BlockId,
        nodes: &[InlineNode],
    ) -> Result<Vec<Replacement>, AnnotateError> {
        let mut plan = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            if node.is_entity() || self.skippable(node.text()) {
                continue;
            }
            let segments = self.settle(segmenter, block, node.text())?;
            if is_unchanged(node.text(), &segments) {
                continue;
            }
            plan.push((i..i + 1, segments));
        }
        Ok(plan)
    }

    /// The whole block as one unit, only while it has no entity nodes.
    fn plan_block<S: Segmenter + ?Sized>(
        &self,
        segmenter: &S,
        block: BlockId,
        nodes: &[InlineNode],
    ) -> Result<Vec<Replacement>, AnnotateError> {
        if nodes.is_empty() || nodes.iter().any(InlineNode::is_entity) {
            return Ok(vec![]);
        }
        let text: String = nodes.iter().map(InlineNode::text).collect();
        if self.skippable(&text) {
            return Ok(vec![]);
        }
        let segments = self.settle(segmenter, block, &text)?;
        if !segments.iter().any(Segment::is_entity) {
            return Ok(vec![]);
        }
        Ok(vec![(0..nodes.len(), segments)])
    }

    /// Verified segments for `text` whose plain runs no longer change when
    /// scanned on their own. A run can hold a match the full scan skipped,
    /// since each name resumes its search after its previous hit.
    fn settle<S: Segmenter + ?Sized>(
        &self,
        segmenter: &S,
        block: BlockId,
        text: &str,
    ) -> Result<Vec<Segment>, AnnotateError> {
        let mut segments = segmenter.segments_for(text, block)?;
        verify_content(text, &segments, Some(block))?;
        if is_unchanged(text, &segments) {
            return Ok(segments);
        }

        for _ in 0..self.config.max_passes_per_block {
            let mut changed = false;
            let mut next = Vec::with_capacity(segments.len());
            for segment in segments {
                match segment {
                    Segment::PlainRun { text: run } if !self.skippable(&run) => {
                        let split = segmenter.segments_for(&run, block)?;
                        verify_content(&run, &split, Some(block))?;
                        if is_unchanged(&run, &split) {
                            next.push(Segment::PlainRun { text: run });
                        } else {
                            changed = true;
                            next.extend(split);
                        }
                    }
                    other => next.push(other),
                }
            }
            segments = next;
            if !changed {
                return Ok(segments);
            }
        }

        diagnostics::debug(&format!("block {}: plain runs still changing after {} rescans", block, self.config.max_passes_per_block));
        Ok(segments)
    }

    fn skippable(&self, text: &str) -> bool {
        text.is_empty() || (self.config.skip_whitespace_only && text.trim().is_empty())
    }
}

/// Fold a plan into one write spanning its first to last replaced node.
/// Untouched nodes in between are carried over by content.
fn combine(nodes: &[InlineNode], plan: Vec<Replacement>) -> Option<Replacement> {
    let start = plan.first()?.0.start;
    let end = plan.last()?.0.end;
    let mut content = Vec::new();
    let mut cursor = start;
    for (range, segments) in plan {
        content.extend(nodes[cursor..range.start].iter().map(|n| n.content.clone()));
        content.extend(segments);
        cursor = range.end;
    }
    Some((start..end, content))
}

// =============================================================================
// Tests
// =============================================================================
