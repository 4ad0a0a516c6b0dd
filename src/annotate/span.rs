//! Span Builder: resolved occurrences to typed text segments.
//!
//! Concatenating the `text` of the produced segments always reproduces the
//! scanned text exactly. [`verify_content`] checks that before anything is
//! written to a document.

use serde::{Deserialize, Serialize};

use crate::annotate::document::BlockId;
use crate::annotate::error::AnnotateError;
use crate::annotate::knowledge::EntityCategory;
use crate::annotate::matcher::Occurrence;

// =============================================================================
// Types
// =============================================================================

/// Entity metadata carried by an entity run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub category: EntityCategory,
    pub canonical_name: String,
    pub info: String,
}

/// An ordered chunk of text, either plain or entity-tagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    PlainRun {
        text: String,
    },
    EntityRun {
        /// The text as it appeared in the document, not the canonical form.
        text: String,
        category: EntityCategory,
        canonical_name: String,
        info: String,
    },
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Segment::PlainRun { text: text.into() }
    }

    pub fn entity(text: impl Into<String>, entity: EntityInfo) -> Self {
        Segment::EntityRun {
            text: text.into(),
            category: entity.category,
            canonical_name: entity.canonical_name,
            info: entity.info,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::PlainRun { text } | Segment::EntityRun { text, .. } => text,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Segment::EntityRun { .. })
    }

    pub fn entity_info(&self) -> Option<EntityInfo> {
        match self {
            Segment::PlainRun { .. } => None,
            Segment::EntityRun { category, canonical_name, info, .. } => Some(EntityInfo {
                category: *category,
                canonical_name: canonical_name.clone(),
                info: info.clone(),
            }),
        }
    }
}

// =============================================================================
// SpanBuilder
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanBuilder;

impl SpanBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `resolved` must be sorted and non-overlapping, as produced by the
    /// conflict resolver for this same `text`.
    pub fn build(&self, text: &str, resolved: &[Occurrence]) -> Vec<Segment> {
        if text.is_empty() {
            return vec![];
        }
        if resolved.is_empty() {
            return vec![Segment::plain(text)];
        }

        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::with_capacity(resolved.len() * 2 + 1);
        let mut cursor = 0usize;

        for occ in resolved {
            if occ.start < cursor || occ.end() > chars.len() {
                continue;
            }
            if occ.start > cursor {
                segments.push(Segment::plain(chars[cursor..occ.start].iter().collect::<String>()));
            }
            segments.push(Segment::EntityRun {
                text: occ.matched_text.clone(),
                category: occ.record.category,
                canonical_name: occ.record.canonical_name.clone(),
                info: occ.record.info.clone(),
            });
            cursor = occ.end();
        }

        if cursor < chars.len() {
            segments.push(Segment::plain(chars[cursor..].iter().collect::<String>()));
        }

        segments
    }
}

/// Concatenated text of a segment sequence.
pub fn flatten(segments: &[Segment]) -> String {
    segments.iter().map(Segment::text).collect()
}

/// Content-preservation check.
pub fn verify_content(expected: &str, segments: &[Segment], block: Option<BlockId>) -> Result<(), AnnotateError> {
    let rebuilt = flatten(segments);
    if rebuilt == expected {
        Ok(())
    } else {
        Err(AnnotateError::ContentMismatch {
            block,
            expected: expected.to_string(),
            rebuilt,
        })
    }
}

/// True when `segments` is a single plain run equal to `text` (or both empty).
pub fn is_unchanged(text: &str, segments: &[Segment]) -> bool {
    match segments {
        [] => text.is_empty(),
        [Segment::PlainRun { text: run }] => run == text,
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================
