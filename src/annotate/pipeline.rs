//! AnnotationPipeline: Matcher -> ConflictResolver -> SpanBuilder.
//!
//! One call turns a text unit into verified segments. Every result has
//! passed the content-preservation check.

use serde::{Deserialize, Serialize};

use crate::annotate::config::MatcherConfig;
use crate::annotate::document::BlockId;
use crate::annotate::error::AnnotateError;
use crate::annotate::knowledge::KnowledgeBase;
use crate::annotate::matcher::Matcher;
use crate::annotate::resolver::ConflictResolver;
use crate::annotate::span::{verify_content, Segment, SpanBuilder};

// =============================================================================
// Types
// =============================================================================

/// Counters and timing for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub occurrences_found: usize,
    pub occurrences_kept: usize,
    pub entity_runs: usize,
    pub elapsed_us: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotated {
    pub segments: Vec<Segment>,
    pub stats: PipelineStats,
}

/// Turns the text of one inline unit into segments.
///
/// The reconciler re-checks content preservation on whatever an
/// implementation returns before writing anything.
pub trait Segmenter {
    fn segments_for(&self, text: &str, block: BlockId) -> Result<Vec<Segment>, AnnotateError>;
}

// =============================================================================
// AnnotationPipeline
// =============================================================================

#[derive(Debug)]
pub struct AnnotationPipeline {
    matcher: Matcher,
    resolver: ConflictResolver,
    builder: SpanBuilder,
}

impl AnnotationPipeline {
    pub fn new<K: KnowledgeBase + ?Sized>(kb: &K, config: MatcherConfig) -> Result<Self, AnnotateError> {
        Ok(Self {
            matcher: Matcher::compile(kb, config)?,
            resolver: ConflictResolver::new(),
            builder: SpanBuilder::new(),
        })
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Annotate a free-standing text.
    pub fn annotate(&self, text: &str) -> Result<Annotated, AnnotateError> {
        self.run(text, None)
    }

    /// Segments for one text unit of `block`. Errors carry the block id.
    pub fn segments_for(&self, text: &str, block: BlockId) -> Result<Vec<Segment>, AnnotateError> {
        self.run(text, Some(block)).map(|a| a.segments)
    }

    fn run(&self, text: &str, block: Option<BlockId>) -> Result<Annotated, AnnotateError> {
        let started = instant::Instant::now();

        let raw = self.matcher.find_occurrences(text);
        let occurrences_found = raw.len();
        let resolved = self.resolver.resolve(raw);
        let segments = self.builder.build(text, &resolved);
        verify_content(text, &segments, block)?;

        let stats = PipelineStats {
            occurrences_found,
            occurrences_kept: resolved.len(),
            entity_runs: segments.iter().filter(|s| s.is_entity()).count(),
            elapsed_us: started.elapsed().as_micros() as u64,
        };
        Ok(Annotated { segments, stats })
    }
}

impl Segmenter for AnnotationPipeline {
    fn segments_for(&self, text: &str, block: BlockId) -> Result<Vec<Segment>, AnnotateError> {
        AnnotationPipeline::segments_for(self, text, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::knowledge::{EntityCategory, EntityRecord, StaticKnowledgeBase};

    fn pipeline() -> AnnotationPipeline {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Person, "Brian Eno", &["Eno"], "Producer."))
            .with(EntityRecord::new(EntityCategory::Place, "CBGB", &[], "Club."));
        AnnotationPipeline::new(&kb, MatcherConfig::default()).unwrap()
    }

    #[test]
    fn test_stats_are_counted() {
        let out = pipeline().annotate("Brian Eno at CBGB").unwrap();
        // "Brian Eno", "Eno", "CBGB"; "Eno" loses to "Brian Eno".
        assert_eq!(out.stats.occurrences_found, 3);
        assert_eq!(out.stats.occurrences_kept, 2);
        assert_eq!(out.stats.entity_runs, 2);
        assert_eq!(out.segments.len(), 3);
    }

    #[test]
    fn test_plain_text_passes_through() {
        let out = pipeline().annotate("nothing here").unwrap();
        assert_eq!(out.segments, vec![Segment::plain("nothing here")]);
        assert_eq!(out.stats.entity_runs, 0);
    }

    #[test]
    fn test_segments_for_block() {
        let segs = pipeline().segments_for("CBGB", BlockId(2)).unwrap();
        assert_eq!(segs.len(), 1);
        assert!(segs[0].is_entity());
    }
}
