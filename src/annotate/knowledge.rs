//! Knowledge Base: the entity records the engine annotates against.
//!
//! Read-only from the engine's perspective. Records are shared by `Arc`
//! and never mutated after loading. Category order and record order are
//! significant: they decide which of two co-starting matches wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::annotate::error::AnnotateError;

// =============================================================================
// Types
// =============================================================================

/// Entity category, in declared scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityCategory {
    Person,
    Organization,
    Place,
}

impl EntityCategory {
    /// Fixed declaration order used by the matcher.
    pub const ALL: [EntityCategory; 3] = [
        EntityCategory::Person,
        EntityCategory::Organization,
        EntityCategory::Place,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Person => "people",
            EntityCategory::Organization => "organizations",
            EntityCategory::Place => "places",
        }
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named thing with a canonical name, aliases and free-text metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub category: EntityCategory,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub info: String,
}

impl EntityRecord {
    pub fn new(
        category: EntityCategory,
        canonical_name: impl Into<String>,
        aliases: &[&str],
        info: impl Into<String>,
    ) -> Self {
        Self {
            category,
            canonical_name: canonical_name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            info: info.into(),
        }
    }

    /// Canonical name followed by aliases, in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Read interface the engine needs from a knowledge base.
///
/// Implementations must return the same categories and records, in the same
/// order, for the whole session.
pub trait KnowledgeBase {
    fn categories(&self) -> Vec<EntityCategory>;

    fn records(&self, category: EntityCategory) -> &[Arc<EntityRecord>];

    /// All records whose canonical name equals `canonical_name`.
    fn records_named(&self, canonical_name: &str) -> Vec<Arc<EntityRecord>> {
        self.categories()
            .into_iter()
            .flat_map(|c| self.records(c).iter())
            .filter(|r| r.canonical_name == canonical_name)
            .cloned()
            .collect()
    }

    fn record_count(&self) -> usize {
        self.categories().into_iter().map(|c| self.records(c).len()).sum()
    }
}

// =============================================================================
// StaticKnowledgeBase
// =============================================================================

/// Record shape used by the editor's entity tables.
#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    #[serde(default, alias = "aliases")]
    variants: Vec<String>,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawKnowledgeBase {
    #[serde(default)]
    people: Vec<RawRecord>,
    #[serde(default)]
    organizations: Vec<RawRecord>,
    #[serde(default)]
    places: Vec<RawRecord>,
}

/// In-memory knowledge base with fixed category order.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase {
    records: BTreeMap<EntityCategory, Vec<Arc<EntityRecord>>>,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "people": [...], "organizations": [...], "places": [...] }`.
    ///
    /// Each record is `{ "name", "variants" | "aliases", "info" }`.
    pub fn from_json(json: &str) -> Result<Self, AnnotateError> {
        let raw: RawKnowledgeBase = serde_json::from_str(json)
            .map_err(|e| AnnotateError::InvalidKnowledgeBase(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// Same as [`StaticKnowledgeBase::from_json`] for an already parsed value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, AnnotateError> {
        let raw: RawKnowledgeBase = serde_json::from_value(value)
            .map_err(|e| AnnotateError::InvalidKnowledgeBase(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawKnowledgeBase) -> Self {
        let mut kb = Self::new();
        let tables = [
            (EntityCategory::Person, raw.people),
            (EntityCategory::Organization, raw.organizations),
            (EntityCategory::Place, raw.places),
        ];
        for (category, rows) in tables {
            for row in rows {
                kb.push(EntityRecord {
                    category,
                    canonical_name: row.name,
                    aliases: row.variants,
                    info: row.info,
                });
            }
        }
        kb
    }

    /// Append a record at the end of its category.
    pub fn push(&mut self, record: EntityRecord) {
        self.records
            .entry(record.category)
            .or_default()
            .push(Arc::new(record));
    }

    /// Builder form of [`StaticKnowledgeBase::push`].
    pub fn with(mut self, record: EntityRecord) -> Self {
        self.push(record);
        self
    }
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn categories(&self) -> Vec<EntityCategory> {
        EntityCategory::ALL.to_vec()
    }

    fn records(&self, category: EntityCategory) -> &[Arc<EntityRecord>] {
        self.records.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "people": [
            { "name": "David Byrne", "variants": ["Byrne", "David"], "info": "Lead singer of Talking Heads." },
            { "name": "Brian Eno", "aliases": ["Eno"], "info": "Producer." }
        ],
        "places": [
            { "name": "CBGB", "variants": ["CBGB & OMFUG"], "info": "Club." }
        ]
    }"#;

    #[test]
    fn test_load_from_json() {
        let kb = StaticKnowledgeBase::from_json(SAMPLE).unwrap();

        assert_eq!(kb.records(EntityCategory::Person).len(), 2);
        assert_eq!(kb.records(EntityCategory::Organization).len(), 0);
        assert_eq!(kb.records(EntityCategory::Place).len(), 1);
        assert_eq!(kb.record_count(), 3);

        let eno = &kb.records(EntityCategory::Person)[1];
        assert_eq!(eno.aliases, vec!["Eno".to_string()]);
    }

    #[test]
    fn test_declared_order_is_preserved() {
        let kb = StaticKnowledgeBase::from_json(SAMPLE).unwrap();
        let names: Vec<&str> = kb.records(EntityCategory::Person)[0].names().collect();
        assert_eq!(names, vec!["David Byrne", "Byrne", "David"]);
        assert_eq!(kb.categories(), EntityCategory::ALL.to_vec());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = StaticKnowledgeBase::from_json("{ \"people\": 3 }").unwrap_err();
        assert!(matches!(err, AnnotateError::InvalidKnowledgeBase(_)));
    }

    #[test]
    fn test_records_named() {
        let kb = StaticKnowledgeBase::from_json(SAMPLE).unwrap();
        let found = kb.records_named("CBGB");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, EntityCategory::Place);
        assert!(kb.records_named("Nobody").is_empty());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(EntityCategory::Person.as_str(), "people");
        assert_eq!(EntityCategory::Place.to_string(), "places");
    }
}
