//! KittMark: Entity Annotation Engine for block editors
//!
//! Finds names of known people, organizations and places in the text of a
//! block editor and turns them into typed entity nodes, while the user keeps
//! typing.
//!
//! # Architecture
//!
//! ## Pipeline
//! - `matcher.rs` - Matcher: every name and alias occurrence via Aho-Corasick
//! - `resolver.rs` - ConflictResolver: earliest start wins, no overlaps
//! - `span.rs` - SpanBuilder: occurrences to plain / entity segments
//! - `pipeline.rs` - AnnotationPipeline: the three stages plus timing
//!
//! ## Live Document
//! - `document.rs` - EditorHost trait and the in-memory MemoryDocument
//! - `reconciler.rs` - Reconciler: rescans changed blocks, loop-guarded
//! - `scheduler.rs` / `fingerprint.rs` - coalescing and skip detection
//! - `navigator.rs` - BoundaryNavigator: escaping an entity's trailing edge
//! - `preview.rs` - hover preview and related mentions
//! - `conductor.rs` - AnnotationConductor: ties the above together
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { EntityAnnotator } from 'kittmark';
//!
//! await init();
//!
//! const annotator = new EntityAnnotator();
//! annotator.hydrateKnowledgeBase(JSON.stringify({
//!   people: [{ name: 'Brian Eno', variants: ['Eno'], info: 'Producer.' }],
//!   places: [{ name: 'CBGB', info: 'Bowery club.' }],
//! }));
//!
//! const block = annotator.createBlock('Eno played CBGB');
//! annotator.pump();
//! console.log(annotator.blockNodes(block)); // entity, plain, entity
//! ```

pub mod annotate;
pub mod wasm;

pub use annotate::*;
pub use wasm::EntityAnnotator;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("kittmark v{}", env!("CARGO_PKG_VERSION"))
}
