//! Conflict Resolver: reduce raw occurrences to a non-overlapping set.
//!
//! Stable sort by start offset, then a single left-to-right sweep. An
//! occurrence is kept only if its start lies outside every occurrence kept so
//! far. Ties at the same start keep the matcher's emission order, so the
//! earliest declared name wins regardless of length. There is no
//! backtracking and no longest-match preference: a short accepted match can
//! suppress a longer one that starts inside it.

use crate::annotate::matcher::Occurrence;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, mut occurrences: Vec<Occurrence>) -> Vec<Occurrence> {
        if occurrences.len() <= 1 {
            return occurrences;
        }

        // `sort_by_key` is stable, which is the tie-break.
        occurrences.sort_by_key(|o| o.start);

        let mut kept: Vec<Occurrence> = Vec::with_capacity(occurrences.len());
        // Kept spans are disjoint and sorted, so the furthest end is all we need.
        let mut covered_until = 0usize;

        for occ in occurrences {
            if !kept.is_empty() && occ.start < covered_until {
                continue;
            }
            covered_until = covered_until.max(occ.end());
            kept.push(occ);
        }

        kept
    }
}
