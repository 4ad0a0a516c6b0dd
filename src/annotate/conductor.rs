//! AnnotationConductor: single coordinator for a live document.
//!
//! # Design Principles
//! 1. State machine: Uninitialized → Ready
//! 2. Owns the host, the reconciler and the navigator; nothing else mutates
//!    the document on the engine's behalf
//! 3. A knowledge base swap rebuilds the pipeline and rescans every block
//!
//! # Usage
//! ```rust,ignore
//! let mut conductor = AnnotationConductor::new(MemoryDocument::new(), AnnotatorConfig::default())?;
//! conductor.hydrate(Arc::new(kb))?;
//! conductor.host_mut().append_block("Brian Eno at CBGB");
//! conductor.pump();
//! ```

use std::sync::Arc;

use crate::annotate::config::AnnotatorConfig;
use crate::annotate::diagnostics;
use crate::annotate::document::{BlockId, ChangeNotification, EditorHost, NodeId, NotificationSource};
use crate::annotate::error::AnnotateError;
use crate::annotate::knowledge::KnowledgeBase;
use crate::annotate::navigator::{BoundaryNavigator, Intent, IntentOutcome};
use crate::annotate::pipeline::{Annotated, AnnotationPipeline};
use crate::annotate::preview::{self, EntityPreview};
use crate::annotate::reconciler::{BlockOutcome, ReconcileStats, Reconciler};
use crate::annotate::span::EntityInfo;

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No knowledge base yet; notifications are dropped
    Uninitialized,
    /// Pipeline compiled, reconciliation active
    Ready,
}

/// What one [`AnnotationConductor::pump`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpReport {
    pub rounds: u32,
    pub notifications: usize,
    pub outcomes: Vec<(BlockId, BlockOutcome)>,
}

impl PumpReport {
    pub fn annotated_blocks(&self) -> Vec<BlockId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, BlockOutcome::Annotated { .. }))
            .map(|(b, _)| *b)
            .collect()
    }
}

// =============================================================================
// AnnotationConductor
// =============================================================================

pub struct AnnotationConductor<H> {
    host: H,
    config: AnnotatorConfig,
    kb: Option<Arc<dyn KnowledgeBase>>,
    pipeline: Option<AnnotationPipeline>,
    reconciler: Reconciler,
    navigator: BoundaryNavigator,
    state: State,
}

impl<H: EditorHost + NotificationSource> AnnotationConductor<H> {
    pub fn new(host: H, config: AnnotatorConfig) -> Result<Self, AnnotateError> {
        config.validate()?;
        Ok(Self {
            host,
            reconciler: Reconciler::new(config.reconciler.clone()),
            navigator: BoundaryNavigator::new(config.navigator.clone()),
            config,
            kb: None,
            pipeline: None,
            state: State::Uninitialized,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access for user edits. Call [`AnnotationConductor::pump`] afterwards.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReconcileStats {
        self.reconciler.stats()
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Current state name (for debugging)
    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::Uninitialized => "uninitialized",
            State::Ready => "ready",
        }
    }

    /// Distinct names compiled into the matcher, 0 before hydration.
    pub fn name_count(&self) -> usize {
        self.pipeline.as_ref().map(|p| p.matcher().name_count()).unwrap_or(0)
    }

    /// Install a knowledge base and rescan every block.
    pub fn hydrate(&mut self, kb: Arc<dyn KnowledgeBase>) -> Result<(), AnnotateError> {
        let pipeline = AnnotationPipeline::new(kb.as_ref(), self.config.matcher.clone())?;
        diagnostics::debug(&format!(
            "hydrated {} records, {} patterns",
            kb.record_count(),
            pipeline.matcher().pattern_count()
        ));
        self.pipeline = Some(pipeline);
        self.kb = Some(kb);
        // Same structure must be rescanned against the new names.
        self.reconciler.reset_fingerprints();
        self.state = State::Ready;

        let everything = ChangeNotification::user(self.host.block_ids());
        self.reconciler.on_change(&self.host, &everything);
        Ok(())
    }

    /// Drop the knowledge base. Existing entity nodes stay as they are.
    pub fn reset(&mut self) {
        self.kb = None;
        self.pipeline = None;
        self.reconciler = Reconciler::new(self.config.reconciler.clone());
        self.state = State::Uninitialized;
    }

    /// Run one update cycle until no block is left to scan.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        let pipeline = match (&self.pipeline, self.state) {
            (Some(pipeline), State::Ready) => pipeline,
            _ => {
                report.notifications = self.host.drain_notifications().len();
                return report;
            }
        };

        self.reconciler.begin_cycle();
        let max_rounds = self.config.reconciler.max_passes_per_block.saturating_add(1);
        while report.rounds < max_rounds {
            let notes = self.host.drain_notifications();
            report.notifications += notes.len();
            for note in &notes {
                self.reconciler.on_change(&self.host, note);
            }
            if !self.reconciler.has_pending() {
                break;
            }
            report.rounds += 1;
            report.outcomes.extend(self.reconciler.flush(&mut self.host, pipeline));
        }
        report
    }

    /// Route a key intent through the boundary navigator, then pump.
    pub fn handle_intent(&mut self, intent: Intent) -> Result<IntentOutcome, AnnotateError> {
        let outcome = self.navigator.handle_intent(&mut self.host, intent)?;
        self.pump();
        Ok(outcome)
    }

    /// Annotate a free-standing text with the current knowledge base.
    pub fn annotate_text(&self, text: &str) -> Result<Annotated, AnnotateError> {
        self.pipeline.as_ref().ok_or(AnnotateError::NotHydrated)?.annotate(text)
    }

    pub fn resolve_entity_at(&self, node: NodeId) -> Option<EntityInfo> {
        preview::resolve_entity_at(&self.host, node)
    }

    pub fn preview(&self, node: NodeId) -> Option<EntityPreview> {
        let kb = self.kb.as_ref()?;
        preview::build_preview(&self.host, kb.as_ref(), node)
    }

    pub fn find_mentions(&self, canonical_name: &str, excluding: Option<BlockId>) -> Vec<BlockId> {
        match &self.kb {
            Some(kb) => preview::find_mentions(&self.host, kb.as_ref(), canonical_name, excluding),
            None => vec![],
        }
    }
}
