//! Boundary Navigator: leaving an entity node from its trailing edge.
//!
//! A caret resting at the end of an entity node would otherwise keep typing
//! into the entity. When it sits there and the user moves right, presses
//! space or tab, a plain separator node is inserted after the entity and the
//! caret moves into it.

use serde::{Deserialize, Serialize};

use crate::annotate::config::{NavigatorConfig, SeparatorSpec};
use crate::annotate::document::{EditorHost, MutationOrigin, NodeId};
use crate::annotate::error::AnnotateError;
use crate::annotate::span::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "node", rename_all = "snake_case")]
pub enum NavState {
    #[default]
    Outside,
    AtTrailingEdge(NodeId),
}

/// Navigation intents the engine may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MoveRight,
    InsertSpace,
    InsertTab,
    Other,
}

impl Intent {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Self {
        match key {
            "ArrowRight" => Intent::MoveRight,
            " " | "Space" | "Spacebar" => Intent::InsertSpace,
            "Tab" => Intent::InsertTab,
            _ => Intent::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    /// The intent was consumed; the framework must not apply its default.
    Handled { separator: NodeId },
    PassThrough,
}

impl IntentOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, IntentOutcome::Handled { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoundaryNavigator {
    config: NavigatorConfig,
    state: NavState,
}

impl BoundaryNavigator {
    pub fn new(config: NavigatorConfig) -> Self {
        Self { config, state: NavState::Outside }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Re-derive the state from the host's cursor.
    pub fn observe<H: EditorHost + ?Sized>(&mut self, host: &H) -> NavState {
        self.state = host
            .collapsed_cursor()
            .and_then(|cursor| {
                let (_, node) = host.node(cursor.node)?;
                (node.is_entity() && cursor.offset == node.char_len()).then_some(NavState::AtTrailingEdge(node.id))
            })
            .unwrap_or(NavState::Outside);
        self.state
    }

    pub fn handle_intent<H: EditorHost + ?Sized>(
        &mut self,
        host: &mut H,
        intent: Intent,
    ) -> Result<IntentOutcome, AnnotateError> {
        let entity = match self.observe(host) {
            NavState::AtTrailingEdge(node) => node,
            NavState::Outside => return Ok(IntentOutcome::PassThrough),
        };
        let separator = match self.separator_for(intent) {
            Some(spec) => spec.clone(),
            None => return Ok(IntentOutcome::PassThrough),
        };

        host.tag_mutation(MutationOrigin::Navigator);
        let node = host.insert_node_after(entity, Segment::plain(separator.text))?;
        host.place_cursor(node, separator.cursor_offset)?;
        self.state = NavState::Outside;
        Ok(IntentOutcome::Handled { separator: node })
    }

    fn separator_for(&self, intent: Intent) -> Option<&SeparatorSpec> {
        match intent {
            Intent::MoveRight => Some(&self.config.move_right),
            Intent::InsertSpace => Some(&self.config.insert_space),
            Intent::InsertTab => Some(&self.config.insert_tab),
            Intent::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::document::{BlockId, MemoryDocument, NotificationSource};
    use crate::annotate::knowledge::EntityCategory;
    use crate::annotate::span::EntityInfo;

    fn doc_with_entity() -> (MemoryDocument, NodeId) {
        let mut doc = MemoryDocument::from_texts(&["CBGB"]);
        let entity = Segment::entity(
            "CBGB",
            EntityInfo {
                category: EntityCategory::Place,
                canonical_name: "CBGB".to_string(),
                info: String::new(),
            },
        );
        let ids = doc.replace_inline_range(BlockId(0), 0..1, vec![entity]).unwrap();
        doc.drain_notifications();
        (doc, ids[0])
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Intent::from_key("ArrowRight"), Intent::MoveRight);
        assert_eq!(Intent::from_key(" "), Intent::InsertSpace);
        assert_eq!(Intent::from_key("Tab"), Intent::InsertTab);
        assert_eq!(Intent::from_key("a"), Intent::Other);
    }

    #[test]
    fn test_observe_trailing_edge_only() {
        let (mut doc, entity) = doc_with_entity();
        let mut nav = BoundaryNavigator::default();
        assert_eq!(nav.observe(&doc), NavState::Outside);

        doc.place_cursor(entity, 2).unwrap();
        assert_eq!(nav.observe(&doc), NavState::Outside);

        doc.place_cursor(entity, 4).unwrap();
        assert_eq!(nav.observe(&doc), NavState::AtTrailingEdge(entity));
    }

    #[test]
    fn test_move_right_inserts_separator() {
        let (mut doc, entity) = doc_with_entity();
        doc.place_cursor(entity, 4).unwrap();
        let mut nav = BoundaryNavigator::default();

        let outcome = nav.handle_intent(&mut doc, Intent::MoveRight).unwrap();
        let IntentOutcome::Handled { separator } = outcome else {
            panic!("expected handled");
        };
        assert_eq!(doc.block_text(BlockId(0)).as_deref(), Some("CBGB "));
        assert_eq!(doc.collapsed_cursor().unwrap().node, separator);
        assert_eq!(doc.collapsed_cursor().unwrap().offset, 0);
        assert_eq!(nav.state(), NavState::Outside);

        let notes = doc.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].origin, MutationOrigin::Navigator);
    }

    #[test]
    fn test_space_uses_two_char_separator() {
        let (mut doc, entity) = doc_with_entity();
        doc.place_cursor(entity, 4).unwrap();
        let mut nav = BoundaryNavigator::default();
        assert!(nav.handle_intent(&mut doc, Intent::InsertSpace).unwrap().is_handled());
        assert_eq!(doc.block_text(BlockId(0)).as_deref(), Some("CBGB  "));
        assert_eq!(doc.collapsed_cursor().unwrap().offset, 1);
    }

    #[test]
    fn test_pass_through_cases() {
        let (mut doc, entity) = doc_with_entity();
        let mut nav = BoundaryNavigator::default();

        // No cursor.
        assert_eq!(nav.handle_intent(&mut doc, Intent::MoveRight).unwrap(), IntentOutcome::PassThrough);

        // Inside the entity.
        doc.place_cursor(entity, 1).unwrap();
        assert_eq!(nav.handle_intent(&mut doc, Intent::InsertTab).unwrap(), IntentOutcome::PassThrough);

        // Unrelated intent at the edge.
        doc.place_cursor(entity, 4).unwrap();
        assert_eq!(nav.handle_intent(&mut doc, Intent::Other).unwrap(), IntentOutcome::PassThrough);
        assert_eq!(doc.pending_notifications(), 0);
    }
}
