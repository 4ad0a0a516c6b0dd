//! Matcher: raw entity-name occurrences in a text unit.
//!
//! Every canonical name and alias of every record is compiled into one
//! Aho-Corasick automaton. Results are reported exactly as a name-by-name
//! scan would report them: categories in declared order, records in declared
//! order, names in declared order, and for each name every occurrence left to
//! right, resuming the search right after the previous hit of that name.
//!
//! Offsets are codepoint offsets into the scanned text, never byte offsets.

use std::collections::HashMap;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::annotate::config::MatcherConfig;
use crate::annotate::error::AnnotateError;
use crate::annotate::knowledge::{EntityRecord, KnowledgeBase};

// =============================================================================
// Types
// =============================================================================

/// A raw, possibly overlapping match of one name.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Codepoint offset of the first matched character.
    pub start: usize,
    /// Length in codepoints.
    pub length: usize,
    /// The text as it appears in the scanned unit (original casing).
    pub matched_text: String,
    pub record: Arc<EntityRecord>,
    /// False when the canonical name matched, true for an alias.
    pub is_alias: bool,
}

impl Occurrence {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// One declared name, in declaration order.
#[derive(Debug, Clone)]
struct NameEntry {
    record: Arc<EntityRecord>,
    is_alias: bool,
}

// =============================================================================
// Matcher
// =============================================================================

pub struct Matcher {
    automaton: Option<AhoCorasick>,
    /// Declaration indices sharing each unique folded pattern.
    pattern_entries: Vec<Vec<usize>>,
    entries: Vec<NameEntry>,
    config: MatcherConfig,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("patterns", &self.pattern_entries.len())
            .field("names", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Matcher {
    /// Compile every name in `kb`. Empty or too-short names are skipped.
    pub fn compile<K: KnowledgeBase + ?Sized>(kb: &K, config: MatcherConfig) -> Result<Self, AnnotateError> {
        let min_chars = config.min_name_chars.max(1);
        let mut entries: Vec<NameEntry> = Vec::new();
        let mut patterns: Vec<String> = Vec::new();
        let mut pattern_entries: Vec<Vec<usize>> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for category in kb.categories() {
            for record in kb.records(category) {
                for (name_index, name) in record.names().enumerate() {
                    if name.trim().chars().count() < min_chars {
                        continue;
                    }
                    let entry_index = entries.len();
                    entries.push(NameEntry {
                        record: Arc::clone(record),
                        is_alias: name_index > 0,
                    });

                    let folded = fold_text(name, &config);
                    match seen.get(&folded) {
                        Some(&pid) => pattern_entries[pid].push(entry_index),
                        None => {
                            seen.insert(folded.clone(), patterns.len());
                            patterns.push(folded);
                            pattern_entries.push(vec![entry_index]);
                        }
                    }
                }
            }
        }

        let automaton = if patterns.is_empty() {
            None
        } else {
            // Standard semantics: overlapping iteration reports every pattern.
            let ac = AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
                .map_err(|e| AnnotateError::InvalidKnowledgeBase(format!("failed to build automaton: {}", e)))?;
            Some(ac)
        };

        Ok(Self {
            automaton,
            pattern_entries,
            entries,
            config,
        })
    }

    /// Number of unique folded patterns in the automaton.
    pub fn pattern_count(&self) -> usize {
        self.pattern_entries.len()
    }

    /// Number of declared names that were compiled.
    pub fn name_count(&self) -> usize {
        self.entries.len()
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// All raw occurrences, in emission order. Never fails; no match means empty.
    pub fn find_occurrences(&self, text: &str) -> Vec<Occurrence> {
        let automaton = match &self.automaton {
            Some(a) => a,
            None => return vec![],
        };
        if text.is_empty() {
            return vec![];
        }

        let chars: Vec<char> = text.chars().collect();
        let folded: String = chars.iter().map(|&c| fold_char(c, &self.config)).collect();
        let char_starts: Vec<usize> = folded.char_indices().map(|(b, _)| b).collect();
        let to_char = |byte: usize| -> usize {
            char_starts.binary_search(&byte).unwrap_or_else(|insert_at| insert_at)
        };

        // Per pattern, the codepoint offset where its next search resumes.
        let mut resume = vec![0usize; self.pattern_entries.len()];
        // (declaration index, start, length)
        let mut hits: Vec<(usize, usize, usize)> = Vec::new();

        for mat in automaton.find_overlapping_iter(&folded) {
            let pid = mat.pattern().as_usize();
            let start = to_char(mat.start());
            let end = to_char(mat.end());
            if start < resume[pid] {
                continue;
            }
            if self.config.word_boundaries && !is_word_bounded(&chars, start, end) {
                continue;
            }
            resume[pid] = end;
            for &entry_index in &self.pattern_entries[pid] {
                hits.push((entry_index, start, end - start));
            }
        }

        hits.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        hits.into_iter()
            .map(|(entry_index, start, length)| {
                let entry = &self.entries[entry_index];
                Occurrence {
                    start,
                    length,
                    matched_text: chars[start..start + length].iter().collect(),
                    record: Arc::clone(&entry.record),
                    is_alias: entry.is_alias,
                }
            })
            .collect()
    }

    /// Quick check whether any name occurs in `text`.
    pub fn contains_any(&self, text: &str) -> bool {
        match &self.automaton {
            Some(a) if !self.config.word_boundaries => {
                let folded: String = text.chars().map(|c| fold_char(c, &self.config)).collect();
                a.is_match(&folded)
            }
            Some(_) => !self.find_occurrences(text).is_empty(),
            None => false,
        }
    }
}

// =============================================================================
// Folding
// =============================================================================

/// Fold one codepoint to exactly one codepoint, so offsets stay aligned.
fn fold_char(c: char, config: &MatcherConfig) -> char {
    let mut out = c;
    if config.fold_diacritics {
        out = strip_marks(out);
    }
    if !config.case_sensitive {
        let mut lower = out.to_lowercase();
        out = match (lower.next(), lower.next()) {
            (Some(l), None) => l,
            _ => out,
        };
    }
    out
}

/// Base character of `c` when its canonical decomposition is that base plus
/// combining marks only. Hangul syllables decompose into jamo, not marks, and
/// are kept whole.
fn strip_marks(c: char) -> char {
    let mut parts = std::iter::once(c).nfd();
    let base = match parts.next() {
        Some(base) => base,
        None => return c,
    };
    if parts.all(is_combining_mark) {
        base
    } else {
        c
    }
}

fn fold_text(text: &str, config: &MatcherConfig) -> String {
    text.chars().map(|c| fold_char(c, config)).collect()
}

fn is_word_bounded(chars: &[char], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !chars[start - 1].is_alphanumeric();
    let after_ok = end >= chars.len() || !chars[end].is_alphanumeric();
    before_ok && after_ok
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::knowledge::{EntityCategory, StaticKnowledgeBase};

    fn kb() -> StaticKnowledgeBase {
        StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Person, "David Byrne", &["Byrne", "David"], "Singer."))
            .with(EntityRecord::new(EntityCategory::Person, "Brian Eno", &["Eno"], "Producer."))
            .with(EntityRecord::new(EntityCategory::Organization, "Talking Heads", &["Heads"], "Band."))
    }

    fn matcher(config: MatcherConfig) -> Matcher {
        Matcher::compile(&kb(), config).unwrap()
    }

    fn summary(occ: &[Occurrence]) -> Vec<(usize, usize, String, String)> {
        occ.iter()
            .map(|o| (o.start, o.length, o.matched_text.clone(), o.record.canonical_name.clone()))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Requirement 1: every name, every occurrence
    // -------------------------------------------------------------------------
    #[test]
    fn test_finds_all_names_and_repeats() {
        let m = matcher(MatcherConfig::default());
        let occ = m.find_occurrences("Eno met Eno");
        assert_eq!(
            summary(&occ),
            vec![
                (0, 3, "Eno".into(), "Brian Eno".into()),
                (8, 3, "Eno".into(), "Brian Eno".into()),
            ]
        );
        assert!(occ.iter().all(|o| o.is_alias));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: emission order is category, record, name, then position
    // -------------------------------------------------------------------------
    #[test]
    fn test_emission_order() {
        let m = matcher(MatcherConfig::default());
        let occ = m.find_occurrences("Talking Heads with David Byrne");
        assert_eq!(
            summary(&occ),
            vec![
                (19, 11, "David Byrne".into(), "David Byrne".into()),
                (25, 5, "Byrne".into(), "David Byrne".into()),
                (19, 5, "David".into(), "David Byrne".into()),
                (0, 13, "Talking Heads".into(), "Talking Heads".into()),
                (8, 5, "Heads".into(), "Talking Heads".into()),
            ]
        );
        assert!(!occ[0].is_alias);
    }

    // -------------------------------------------------------------------------
    // Requirement 3: a name never overlaps itself
    // -------------------------------------------------------------------------
    #[test]
    fn test_self_overlap_resumes_after_match() {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Place, "aa", &[], ""));
        let m = Matcher::compile(&kb, MatcherConfig::default()).unwrap();
        let starts: Vec<usize> = m.find_occurrences("aaaaa").iter().map(|o| o.start).collect();
        assert_eq!(starts, vec![0, 2]);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: offsets are codepoints
    // -------------------------------------------------------------------------
    #[test]
    fn test_codepoint_offsets() {
        let m = matcher(MatcherConfig::default());
        let occ = m.find_occurrences("héllo ✨ Eno");
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].start, 8);
        assert_eq!(occ[0].length, 3);
    }

    // -------------------------------------------------------------------------
    // Requirement 5: plain substring matching by default
    // -------------------------------------------------------------------------
    #[test]
    fn test_substring_inside_words() {
        let m = matcher(MatcherConfig::default());
        let occ = m.find_occurrences("Enormous");
        assert_eq!(summary(&occ), vec![(0, 3, "Eno".into(), "Brian Eno".into())]);
    }

    #[test]
    fn test_word_boundary_knob() {
        let m = matcher(MatcherConfig { word_boundaries: true, ..MatcherConfig::default() });
        assert!(m.find_occurrences("Enormous").is_empty());
        assert_eq!(m.find_occurrences("Eno, then Enos").len(), 1);
        assert!(!m.contains_any("Enormous"));
    }

    // -------------------------------------------------------------------------
    // Requirement 6: case and diacritics knobs
    // -------------------------------------------------------------------------
    #[test]
    fn test_case_sensitive_by_default() {
        let m = matcher(MatcherConfig::default());
        assert!(m.find_occurrences("brian eno").is_empty());
    }

    #[test]
    fn test_case_insensitive_keeps_original_text() {
        let m = matcher(MatcherConfig { case_sensitive: false, ..MatcherConfig::default() });
        let occ = m.find_occurrences("brian ENO");
        assert_eq!(occ[0].matched_text, "brian ENO");
        assert_eq!(occ[0].record.canonical_name, "Brian Eno");
    }

    #[test]
    fn test_diacritic_folding() {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Person, "Bjork", &[], "Singer."));
        let m = Matcher::compile(&kb, MatcherConfig { fold_diacritics: true, ..MatcherConfig::default() }).unwrap();
        let occ = m.find_occurrences("Björk sings");
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].matched_text, "Björk");
    }

    #[test]
    fn test_diacritic_folding_keeps_hangul_syllables() {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Place, "한국", &[], "Country."));
        let m = Matcher::compile(&kb, MatcherConfig { fold_diacritics: true, ..MatcherConfig::default() }).unwrap();
        assert!(m.find_occurrences("하기 싫다").is_empty());

        let occ = m.find_occurrences("나는 한국 사람");
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].start, 3);
        assert_eq!(occ[0].matched_text, "한국");
    }

    // -------------------------------------------------------------------------
    // Requirement 7: malformed names are ignored
    // -------------------------------------------------------------------------
    #[test]
    fn test_empty_names_ignored() {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Person, "", &["  ", "Eno"], ""));
        let m = Matcher::compile(&kb, MatcherConfig::default()).unwrap();
        assert_eq!(m.name_count(), 1);
        assert_eq!(m.find_occurrences("Eno").len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let m = matcher(MatcherConfig::default());
        assert!(m.find_occurrences("").is_empty());

        let empty = Matcher::compile(&StaticKnowledgeBase::new(), MatcherConfig::default()).unwrap();
        assert_eq!(empty.pattern_count(), 0);
        assert!(empty.find_occurrences("Brian Eno").is_empty());
        assert!(!empty.contains_any("Brian Eno"));
    }

    // -------------------------------------------------------------------------
    // Requirement 8: shared names are reported once per record
    // -------------------------------------------------------------------------
    #[test]
    fn test_shared_alias_reported_per_record() {
        let kb = StaticKnowledgeBase::new()
            .with(EntityRecord::new(EntityCategory::Person, "David Byrne", &["David"], ""))
            .with(EntityRecord::new(EntityCategory::Person, "David Bowie", &["David"], ""));
        let m = Matcher::compile(&kb, MatcherConfig::default()).unwrap();
        assert_eq!(m.pattern_count(), 3);
        let owners: Vec<String> = m.find_occurrences("David").iter().map(|o| o.record.canonical_name.clone()).collect();
        assert_eq!(owners, vec!["David Byrne".to_string(), "David Bowie".to_string()]);
    }
}
