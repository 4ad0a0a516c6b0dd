//! Engine configuration.
//!
//! Every field has a serde default so partial JSON objects are accepted.

use serde::{Deserialize, Serialize};

use crate::annotate::error::AnnotateError;

fn default_true() -> bool { true }
fn default_min_name_chars() -> usize { 1 }
fn default_max_passes() -> u32 { 8 }

// =============================================================================
// Matcher
// =============================================================================

/// Matching knobs. The defaults are plain case-sensitive substring matching,
/// so short aliases can match inside longer words.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatcherConfig {
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// Compare base characters only ("Björk" matches "Bjork").
    #[serde(default)]
    pub fold_diacritics: bool,
    /// Require matches to start and end on word boundaries.
    #[serde(default)]
    pub word_boundaries: bool,
    /// Names shorter than this many codepoints (after trimming) are ignored.
    #[serde(default = "default_min_name_chars")]
    pub min_name_chars: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            fold_diacritics: false,
            word_boundaries: false,
            min_name_chars: 1,
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Unit of rescanning.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanGranularity {
    /// Each plain inline node is scanned on its own.
    #[default]
    Node,
    /// The whole block is scanned as one unit, only while it holds no entity nodes.
    Block,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReconcilerConfig {
    #[serde(default)]
    pub granularity: ScanGranularity,
    /// Circuit breaker: passes allowed per block in one update cycle.
    #[serde(default = "default_max_passes")]
    pub max_passes_per_block: u32,
    #[serde(default = "default_true")]
    pub skip_whitespace_only: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            granularity: ScanGranularity::Node,
            max_passes_per_block: default_max_passes(),
            skip_whitespace_only: true,
        }
    }
}

// =============================================================================
// Navigator
// =============================================================================

/// Separator inserted after an entity node and where the cursor lands in it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SeparatorSpec {
    pub text: String,
    pub cursor_offset: usize,
}

impl SeparatorSpec {
    pub fn new(text: &str, cursor_offset: usize) -> Self {
        Self { text: text.to_string(), cursor_offset }
    }
}

fn default_move_right() -> SeparatorSpec { SeparatorSpec::new(" ", 0) }
fn default_insert_space() -> SeparatorSpec { SeparatorSpec::new("  ", 1) }
fn default_insert_tab() -> SeparatorSpec { SeparatorSpec::new(" ", 0) }

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NavigatorConfig {
    #[serde(default = "default_move_right")]
    pub move_right: SeparatorSpec,
    #[serde(default = "default_insert_space")]
    pub insert_space: SeparatorSpec,
    #[serde(default = "default_insert_tab")]
    pub insert_tab: SeparatorSpec,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            move_right: default_move_right(),
            insert_space: default_insert_space(),
            insert_tab: default_insert_tab(),
        }
    }
}

// =============================================================================
// Top level
// =============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AnnotatorConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub navigator: NavigatorConfig,
}

impl AnnotatorConfig {
    pub fn from_json(json: &str) -> Result<Self, AnnotateError> {
        let config: AnnotatorConfig =
            serde_json::from_str(json).map_err(|e| AnnotateError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnnotateError> {
        if self.reconciler.max_passes_per_block == 0 {
            return Err(AnnotateError::InvalidConfig(
                "max_passes_per_block must be at least 1".to_string(),
            ));
        }
        let separators = [
            ("move_right", &self.navigator.move_right),
            ("insert_space", &self.navigator.insert_space),
            ("insert_tab", &self.navigator.insert_tab),
        ];
        for (name, spec) in separators {
            let len = spec.text.chars().count();
            if len == 0 || spec.cursor_offset > len {
                return Err(AnnotateError::InvalidConfig(format!(
                    "{} separator must be non-empty with cursor_offset <= {}",
                    name, len
                )));
            }
        }
        Ok(())
    }
}
