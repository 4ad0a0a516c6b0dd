//! JavaScript bindings for a live annotated document.
//!
//! Node and block ids cross the boundary as plain numbers; structured
//! results are plain objects produced with `serde_wasm_bindgen`.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::annotate::config::AnnotatorConfig;
use crate::annotate::conductor::AnnotationConductor;
use crate::annotate::document::{BlockId, EditorHost, MemoryDocument, NodeId};
use crate::annotate::knowledge::StaticKnowledgeBase;
use crate::annotate::navigator::Intent;
use crate::annotate::preview::RelatedBlock;
use crate::annotate::span::EntityInfo;

#[derive(serde::Serialize)]
struct PreviewView<'a> {
    entity: &'a EntityInfo,
    related: &'a [RelatedBlock],
    label: Option<String>,
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct EntityAnnotator {
    inner: AnnotationConductor<MemoryDocument>,
}

#[wasm_bindgen]
impl EntityAnnotator {
    /// `config` may be `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<EntityAnnotator, JsValue> {
        let config: AnnotatorConfig = if config.is_undefined() || config.is_null() {
            AnnotatorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?
        };
        let inner = AnnotationConductor::new(MemoryDocument::new(), config).map_err(js_err)?;
        Ok(EntityAnnotator { inner })
    }

    /// Expects `{ people: [...], organizations: [...], places: [...] }`.
    #[wasm_bindgen(js_name = hydrateKnowledgeBase)]
    pub fn hydrate_knowledge_base(&mut self, json: &str) -> Result<(), JsValue> {
        let kb = StaticKnowledgeBase::from_json(json).map_err(js_err)?;
        self.inner.hydrate(Arc::new(kb)).map_err(js_err)
    }

    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// Segments and stats for a free-standing text.
    #[wasm_bindgen(js_name = annotateText)]
    pub fn annotate_text(&self, text: &str) -> Result<JsValue, JsValue> {
        let annotated = self.inner.annotate_text(text).map_err(js_err)?;
        to_js(&annotated)
    }

    #[wasm_bindgen(js_name = createBlock)]
    pub fn create_block(&mut self, text: &str) -> u32 {
        self.inner.host_mut().append_block(text).0
    }

    #[wasm_bindgen(js_name = removeBlock)]
    pub fn remove_block(&mut self, block: u32) -> Result<(), JsValue> {
        self.inner.host_mut().remove_block(BlockId(block)).map_err(js_err)
    }

    #[wasm_bindgen(js_name = blockIds)]
    pub fn block_ids(&self) -> js_sys::Array {
        self.inner
            .host()
            .block_ids()
            .into_iter()
            .map(|b| JsValue::from(b.0))
            .collect()
    }

    #[wasm_bindgen(js_name = blockText)]
    pub fn block_text(&self, block: u32) -> Option<String> {
        self.inner.host().block_text(BlockId(block))
    }

    /// Inline nodes of a block as `[{ id, content }]`.
    #[wasm_bindgen(js_name = blockNodes)]
    pub fn block_nodes(&self, block: u32) -> Result<JsValue, JsValue> {
        let nodes = self
            .inner
            .host()
            .inline_nodes(BlockId(block))
            .ok_or_else(|| JsValue::from_str(&format!("unknown block {}", block)))?;
        to_js(&nodes)
    }

    #[wasm_bindgen(js_name = insertText)]
    pub fn insert_text(&mut self, node: u32, offset: usize, text: &str) -> Result<(), JsValue> {
        self.inner.host_mut().insert_text(NodeId(node), offset, text).map_err(js_err)
    }

    /// Typing at a block-level offset; also works on an empty block.
    #[wasm_bindgen(js_name = insertIntoBlock)]
    pub fn insert_into_block(&mut self, block: u32, offset: usize, text: &str) -> Result<(), JsValue> {
        self.inner.host_mut().insert_text_at(BlockId(block), offset, text).map_err(js_err)
    }

    #[wasm_bindgen(js_name = deleteText)]
    pub fn delete_text(&mut self, node: u32, start: usize, end: usize) -> Result<(), JsValue> {
        self.inner.host_mut().delete_text(NodeId(node), start, end).map_err(js_err)
    }

    #[wasm_bindgen(js_name = placeCursor)]
    pub fn place_cursor(&mut self, node: u32, offset: usize) -> Result<(), JsValue> {
        self.inner.host_mut().place_cursor(NodeId(node), offset).map_err(js_err)
    }

    #[wasm_bindgen(js_name = cursor)]
    pub fn cursor(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.host().collapsed_cursor())
    }

    /// Returns true when the key was consumed and the default action must be
    /// suppressed.
    #[wasm_bindgen(js_name = handleKey)]
    pub fn handle_key(&mut self, key: &str) -> Result<bool, JsValue> {
        let outcome = self.inner.handle_intent(Intent::from_key(key)).map_err(js_err)?;
        Ok(outcome.is_handled())
    }

    /// Reconcile pending changes; returns cumulative counters.
    #[wasm_bindgen]
    pub fn pump(&mut self) -> Result<JsValue, JsValue> {
        self.inner.pump();
        to_js(self.inner.stats())
    }

    #[wasm_bindgen(js_name = resolveEntityAt)]
    pub fn resolve_entity_at(&self, node: u32) -> Result<JsValue, JsValue> {
        to_js(&self.inner.resolve_entity_at(NodeId(node)))
    }

    /// `{ entity, related, label }`, or `null` for non-entity nodes.
    #[wasm_bindgen]
    pub fn preview(&self, node: u32) -> Result<JsValue, JsValue> {
        match self.inner.preview(NodeId(node)) {
            Some(preview) => to_js(&PreviewView {
                entity: &preview.entity,
                related: &preview.related,
                label: preview.mention_label(),
            }),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = findMentions)]
    pub fn find_mentions(&self, canonical_name: &str, excluding: Option<u32>) -> Vec<u32> {
        self.inner
            .find_mentions(canonical_name, excluding.map(BlockId))
            .into_iter()
            .map(|b| b.0)
            .collect()
    }

    #[wasm_bindgen(js_name = documentText)]
    pub fn document_text(&self) -> String {
        self.inner.host().text()
    }
}
